use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use course_core::model::{Article, DiaryLink, ParticipantId};
use course_core::next_fire::next_fire_instant;
use course_core::schedule::Schedule;
use course_core::time::Clock;
use storage::repository::{ContentRepository, ParticipantRepository};

use crate::dispatch::{NotificationDispatcher, StepNotification};
use crate::error::SchedulerError;
use crate::timer::TimerRegistry;

/// Delay used when a notification is armed for a target already in the past.
const DEFAULT_CATCH_UP_DELAY: Duration = Duration::from_secs(5);

//
// ─── PARTICIPANT LOCKS ─────────────────────────────────────────────────────────
//

/// Keyed async mutexes serializing all work for one participant.
#[derive(Clone, Default)]
struct ParticipantLocks {
    slots: Arc<Mutex<HashMap<ParticipantId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ParticipantLocks {
    async fn acquire(&self, id: ParticipantId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(id).or_default())
        };
        slot.lock_owned().await
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Keeps each active participant's single pending notification timer in
/// line with their stored progress.
///
/// The stored record is the only durable state; timers are derived from it
/// and rebuilt from it on restart via [`Scheduler::recover`].
#[derive(Clone)]
pub struct Scheduler {
    clock: Clock,
    schedule: Schedule,
    participants: Arc<dyn ParticipantRepository>,
    content: Arc<dyn ContentRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    timers: TimerRegistry,
    locks: ParticipantLocks,
    catch_up_delay: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        clock: Clock,
        schedule: Schedule,
        participants: Arc<dyn ParticipantRepository>,
        content: Arc<dyn ContentRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            clock,
            schedule,
            participants,
            content,
            dispatcher,
            timers: TimerRegistry::new(),
            locks: ParticipantLocks::default(),
            catch_up_delay: DEFAULT_CATCH_UP_DELAY,
        }
    }

    /// Override the delay used for past-due targets (usually for tests).
    #[must_use]
    pub fn with_catch_up_delay(mut self, delay: Duration) -> Self {
        self.catch_up_delay = delay;
        self
    }

    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    #[must_use]
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Serializes caller work for one participant alongside the fired-timer
    /// path. Callers holding this guard use [`Scheduler::rearm_locked`].
    pub(crate) async fn lock_participant(&self, id: ParticipantId) -> OwnedMutexGuard<()> {
        self.locks.acquire(id).await
    }

    /// Recomputes the participant's next notification and replaces their
    /// timer.
    ///
    /// Returns the computed target instant, or `None` when no notification
    /// is due (missing record, inactive or complete program); any pending
    /// timer is canceled in that case. With `force_immediate`, or when the
    /// target has already passed, the timer is armed with the short
    /// catch-up delay instead of the exact remaining time.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Storage` if the record cannot be loaded and
    /// `SchedulerError::Schedule` if the stored step count has no pacing
    /// entry. In both cases any pending timer is canceled rather than left
    /// to fire against unknown state.
    pub async fn rearm(
        &self,
        id: ParticipantId,
        force_immediate: bool,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        let _guard = self.locks.acquire(id).await;
        self.rearm_locked(id, force_immediate).await
    }

    pub(crate) async fn rearm_locked(
        &self,
        id: ParticipantId,
        force_immediate: bool,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        let record = match self.participants.get(id).await {
            Ok(record) => record,
            Err(err) => {
                self.timers.cancel(id);
                return Err(err.into());
            }
        };
        let Some(record) = record else {
            self.timers.cancel(id);
            return Ok(None);
        };

        let target = match next_fire_instant(&self.schedule, &record) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(
                    participant = %id,
                    error = %err,
                    "withholding notification; next instant cannot be computed"
                );
                self.timers.cancel(id);
                return Err(err.into());
            }
        };
        let Some(fire_at) = target else {
            self.timers.cancel(id);
            return Ok(None);
        };

        let now = self.clock.now();
        let delay = if force_immediate || fire_at <= now {
            self.catch_up_delay
        } else {
            (fire_at - now).to_std().unwrap_or(self.catch_up_delay)
        };

        let scheduler = self.clone();
        self.timers.arm(id, fire_at, delay, move || async move {
            scheduler.fire(id).await;
        });

        tracing::debug!(
            participant = %id,
            due_at = %fire_at,
            delay_secs = delay.as_secs(),
            "notification timer armed"
        );
        Ok(Some(fire_at))
    }

    /// Rebuilds timers from stored progress, one per started, unfinished
    /// program. Returns how many timers were armed.
    ///
    /// Runs once at process start, before external events are handled. A
    /// failure for one participant is logged and skipped so a single bad
    /// record cannot block the sweep.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Storage` only if the initial scan itself
    /// fails.
    pub async fn recover(&self) -> Result<usize, SchedulerError> {
        let ids = self.participants.active_programs().await?;
        let scanned = ids.len();
        let mut armed = 0_usize;
        for id in ids {
            match self.rearm(id, false).await {
                Ok(Some(_)) => armed += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        participant = %id,
                        error = %err,
                        "skipping participant in recovery sweep"
                    );
                }
            }
        }
        tracing::info!(scanned, armed, "notification timers rebuilt");
        Ok(armed)
    }

    /// Runs when a timer expires: re-reads the record and hands the due
    /// step to the dispatcher.
    ///
    /// No retry and no rearm happen here; the next timer is armed when the
    /// participant confirms the step.
    async fn fire(&self, id: ParticipantId) {
        let _guard = self.locks.acquire(id).await;

        let record = match self.participants.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(participant = %id, "timer fired but no record exists");
                return;
            }
            Err(err) => {
                tracing::warn!(
                    participant = %id,
                    error = %err,
                    "cannot load record for due notification"
                );
                return;
            }
        };

        let Some(step) = record.next_step() else {
            // Stopped or completed after this timer was armed.
            tracing::debug!(participant = %id, "due timer found no step to announce");
            return;
        };

        let (diary, article) = self.step_links(step).await;
        let notification = StepNotification {
            participant: id,
            step,
            diary,
            article,
        };
        if let Err(err) = self.dispatcher.deliver(notification).await {
            tracing::warn!(
                participant = %id,
                step,
                error = %err,
                "notification hand-off failed"
            );
        }
    }

    /// Looks up the step's content links; storage trouble degrades to
    /// `None` so the notification itself still goes out.
    async fn step_links(&self, step: u8) -> (Option<DiaryLink>, Option<Article>) {
        let diary = self.content.diary_link(step).await.unwrap_or_else(|err| {
            tracing::warn!(step, error = %err, "diary link lookup failed");
            None
        });
        let article = self.content.article(step).await.unwrap_or_else(|err| {
            tracing::warn!(step, error = %err, "article lookup failed");
            None
        });
        (diary, article)
    }
}
