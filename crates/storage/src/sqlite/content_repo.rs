use course_core::model::{Article, DiaryLink};

use super::{
    SqliteRepository,
    mapping::{map_article_row, map_diary_row},
};
use crate::repository::{ContentRepository, StorageError};

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn diary_link(&self, step: u8) -> Result<Option<DiaryLink>, StorageError> {
        let row = sqlx::query("SELECT step, url FROM step_diaries WHERE step = ?1")
            .bind(i64::from(step))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_diary_row).transpose()
    }

    async fn article(&self, step: u8) -> Result<Option<Article>, StorageError> {
        let row = sqlx::query("SELECT step, title, url FROM step_articles WHERE step = ?1")
            .bind(i64::from(step))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_article_row).transpose()
    }

    async fn upsert_diary_link(&self, link: &DiaryLink) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO step_diaries (step, url)
            VALUES (?1, ?2)
            ON CONFLICT(step) DO UPDATE SET
                url = excluded.url
            ",
        )
        .bind(i64::from(link.step()))
        .bind(link.url().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_article(&self, article: &Article) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO step_articles (step, title, url)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(step) DO UPDATE SET
                title = excluded.title,
                url = excluded.url
            ",
        )
        .bind(i64::from(article.step()))
        .bind(article.title())
        .bind(article.url().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
