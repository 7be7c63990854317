use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: participants, step diary links, step articles,
/// and the index backing the recovery scan.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS participants (
                    id INTEGER PRIMARY KEY,
                    completed_steps INTEGER NOT NULL CHECK (completed_steps BETWEEN 0 AND 50),
                    start_date TEXT,
                    last_completed_at TEXT,
                    notification_hour INTEGER NOT NULL CHECK (notification_hour BETWEEN 0 AND 23),
                    utc_offset_hours INTEGER NOT NULL CHECK (utc_offset_hours BETWEEN -12 AND 14),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS step_diaries (
                    step INTEGER PRIMARY KEY CHECK (step BETWEEN 1 AND 50),
                    url TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS step_articles (
                    step INTEGER PRIMARY KEY CHECK (step BETWEEN 1 AND 50),
                    title TEXT NOT NULL,
                    url TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Partial index for the restart sweep over unfinished programs.
        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_participants_active
                    ON participants (id)
                    WHERE start_date IS NOT NULL AND completed_steps < 50;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
