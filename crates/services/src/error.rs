//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::ProgressError;
use course_core::schedule::ScheduleError;
use storage::repository::StorageError;

/// Errors emitted by notification dispatchers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("delivery channel rejected the notification: {reason}")]
    Rejected { reason: String },
    #[error("delivery channel unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors emitted by `Scheduler`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgramService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgramError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
