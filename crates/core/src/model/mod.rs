mod content;
mod ids;
mod progress;

pub use content::{Article, ContentError, DiaryLink};
pub use ids::{ParseIdError, ParticipantId};
pub use progress::{
    DEFAULT_NOTIFICATION_HOUR, NotificationPrefs, ProgramState, ProgressError, ProgressRecord,
};
