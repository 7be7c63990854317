use async_trait::async_trait;
use course_core::model::{Article, DiaryLink, ParticipantId, ProgramState, ProgressRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for participant progress records.
///
/// The record is the single durable source of truth the scheduler consults;
/// an upsert must be durable before any rearm reads it back.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Fetch a participant's record, if one exists.
    ///
    /// Absence is a normal state (first contact), not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get(&self, id: ParticipantId) -> Result<Option<ProgressRecord>, StorageError>;

    /// Persist the whole record, inserting or replacing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Ids of every participant with a started, unfinished program.
    ///
    /// This is the recovery sweep's scan; results come back in stable id
    /// order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_programs(&self) -> Result<Vec<ParticipantId>, StorageError>;
}

/// Repository contract for per-step content links.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Diary link for a step, if seeded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn diary_link(&self, step: u8) -> Result<Option<DiaryLink>, StorageError>;

    /// Companion article for a step. Later steps legitimately have none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn article(&self, step: u8) -> Result<Option<Article>, StorageError>;

    /// Persist or update a diary link.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the link cannot be stored.
    async fn upsert_diary_link(&self, link: &DiaryLink) -> Result<(), StorageError>;

    /// Persist or update an article.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the article cannot be stored.
    async fn upsert_article(&self, article: &Article) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    participants: Arc<Mutex<HashMap<ParticipantId, ProgressRecord>>>,
    diaries: Arc<Mutex<HashMap<u8, DiaryLink>>>,
    articles: Arc<Mutex<HashMap<u8, Article>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            participants: Arc::new(Mutex::new(HashMap::new())),
            diaries: Arc::new(Mutex::new(HashMap::new())),
            articles: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryRepository {
    async fn get(&self, id: ParticipantId) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .participants
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self
            .participants
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.participant(), record.clone());
        Ok(())
    }

    async fn active_programs(&self) -> Result<Vec<ParticipantId>, StorageError> {
        let guard = self
            .participants
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut ids: Vec<ParticipantId> = guard
            .values()
            .filter(|record| matches!(record.state(), ProgramState::Active { .. }))
            .map(ProgressRecord::participant)
            .collect();
        ids.sort_by_key(ParticipantId::value);
        Ok(ids)
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn diary_link(&self, step: u8) -> Result<Option<DiaryLink>, StorageError> {
        let guard = self
            .diaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&step).cloned())
    }

    async fn article(&self, step: u8) -> Result<Option<Article>, StorageError> {
        let guard = self
            .articles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&step).cloned())
    }

    async fn upsert_diary_link(&self, link: &DiaryLink) -> Result<(), StorageError> {
        let mut guard = self
            .diaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(link.step(), link.clone());
        Ok(())
    }

    async fn upsert_article(&self, article: &Article) -> Result<(), StorageError> {
        let mut guard = self
            .articles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(article.step(), article.clone());
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub participants: Arc<dyn ParticipantRepository>,
    pub content: Arc<dyn ContentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let participants: Arc<dyn ParticipantRepository> = Arc::new(repo.clone());
        let content: Arc<dyn ContentRepository> = Arc::new(repo);
        Self {
            participants,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use course_core::model::NotificationPrefs;
    use course_core::time::fixed_now;

    fn started_record(id: i64, completed_steps: u8) -> ProgressRecord {
        ProgressRecord::from_persisted(
            ParticipantId::new(id),
            completed_steps,
            Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            None,
            NotificationPrefs::default(),
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_participant() {
        let repo = InMemoryRepository::new();
        let fetched = repo.get(ParticipantId::new(1)).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        let record = started_record(1, 3);
        repo.upsert(&record).await.unwrap();

        let fetched = repo.get(ParticipantId::new(1)).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn upsert_replaces_previous_record() {
        let repo = InMemoryRepository::new();
        repo.upsert(&started_record(1, 3)).await.unwrap();
        repo.upsert(&started_record(1, 4)).await.unwrap();

        let fetched = repo.get(ParticipantId::new(1)).await.unwrap().unwrap();
        assert_eq!(fetched.completed_steps(), 4);
    }

    #[tokio::test]
    async fn active_programs_filters_inactive_and_complete() {
        let repo = InMemoryRepository::new();
        repo.upsert(&started_record(3, 10)).await.unwrap();
        repo.upsert(&started_record(1, 0)).await.unwrap();
        // never started
        repo.upsert(&ProgressRecord::new(ParticipantId::new(2), fixed_now()))
            .await
            .unwrap();
        // finished
        repo.upsert(&started_record(4, 50)).await.unwrap();

        let active = repo.active_programs().await.unwrap();
        assert_eq!(active, vec![ParticipantId::new(1), ParticipantId::new(3)]);
    }

    #[tokio::test]
    async fn content_lookup_round_trips() {
        let repo = InMemoryRepository::new();
        let link = DiaryLink::new(5, "https://telegra.ph/step-diary-05").unwrap();
        let article = Article::new(5, "Week one habits", "https://telegra.ph/step-notes-05").unwrap();
        repo.upsert_diary_link(&link).await.unwrap();
        repo.upsert_article(&article).await.unwrap();

        assert_eq!(repo.diary_link(5).await.unwrap(), Some(link));
        assert_eq!(repo.article(5).await.unwrap(), Some(article));
        assert_eq!(repo.diary_link(6).await.unwrap(), None);
        assert_eq!(repo.article(40).await.unwrap(), None);
    }
}
