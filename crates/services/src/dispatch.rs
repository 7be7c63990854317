use async_trait::async_trait;
use course_core::model::{Article, DiaryLink, ParticipantId};

use crate::error::DispatchError;

/// Payload handed to the delivery channel when a step comes due.
///
/// Content links are resolved at the fire site; a dispatcher only carries
/// them onward.
#[derive(Debug, Clone)]
pub struct StepNotification {
    pub participant: ParticipantId,
    pub step: u8,
    pub diary: Option<DiaryLink>,
    pub article: Option<Article>,
}

/// Hand-off seam between the scheduler and whatever delivers messages.
///
/// The scheduler's obligation ends at `deliver`: failures are logged by the
/// caller and never retried.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers one step notification.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the channel rejects the notification or
    /// is unreachable.
    async fn deliver(&self, notification: StepNotification) -> Result<(), DispatchError>;
}

/// Dispatcher that records deliveries in the log and nothing else.
///
/// Default wiring for the daemon until a real channel is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn deliver(&self, notification: StepNotification) -> Result<(), DispatchError> {
        tracing::info!(
            participant = %notification.participant,
            step = notification.step,
            diary = notification.diary.as_ref().map(|link| link.url().as_str()),
            article = notification.article.as_ref().map(|a| a.url().as_str()),
            "step notification"
        );
        Ok(())
    }
}
