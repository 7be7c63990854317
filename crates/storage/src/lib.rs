#![forbid(unsafe_code)]

//! Persistence for participant progress and step content.
//!
//! Repositories are trait objects so the services crate can run against the
//! in-memory double in tests and `SQLite` in production.

pub mod repository;
pub mod sqlite;

pub use repository::{
    ContentRepository, InMemoryRepository, ParticipantRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
