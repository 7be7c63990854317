use course_core::model::{ParticipantId, ProgressRecord};
use sqlx::Row;

use super::{SqliteRepository, mapping::map_participant_row};
use crate::repository::{ParticipantRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl ParticipantRepository for SqliteRepository {
    async fn get(&self, id: ParticipantId) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, completed_steps, start_date, last_completed_at,
                notification_hour, utc_offset_hours, created_at
            FROM participants
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_participant_row).transpose()
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO participants (
                id, completed_steps, start_date, last_completed_at,
                notification_hour, utc_offset_hours, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                completed_steps = excluded.completed_steps,
                start_date = excluded.start_date,
                last_completed_at = excluded.last_completed_at,
                notification_hour = excluded.notification_hour,
                utc_offset_hours = excluded.utc_offset_hours
            ",
        )
        .bind(record.participant().value())
        .bind(i64::from(record.completed_steps()))
        .bind(record.start_date())
        .bind(record.last_completed_at())
        .bind(i64::from(record.prefs().hour()))
        .bind(i64::from(record.prefs().utc_offset_hours()))
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn active_programs(&self) -> Result<Vec<ParticipantId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id
            FROM participants
            WHERE start_date IS NOT NULL
              AND completed_steps < 50
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            ids.push(ParticipantId::new(id));
        }
        Ok(ids)
    }
}
