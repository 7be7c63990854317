use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use course_core::model::{
    NotificationPrefs, ParticipantId, ProgramState, ProgressError, ProgressRecord,
};
use course_core::next_fire::next_fire_instant;
use course_core::time::{Clock, local_date, local_reading};
use storage::repository::ParticipantRepository;

use crate::error::{ProgramError, SchedulerError};
use crate::scheduler::Scheduler;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Read-only snapshot of one participant's progress and pending timer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramStatus {
    pub state: ProgramState,
    pub completed_steps: u8,
    pub next_step: Option<u8>,
    pub next_fire_utc: Option<DateTime<Utc>>,
    /// The same instant as a wall-clock reading at the participant's offset.
    pub next_fire_local: Option<NaiveDateTime>,
    pub timer_armed: bool,
}

//
// ─── PROGRAM SERVICE ───────────────────────────────────────────────────────────
//

/// Command surface for the 50-step program: start, confirm, stop, status.
///
/// Each mutation runs under the participant's keyed lock so user commands,
/// fired timers and the recovery sweep cannot interleave for one person.
#[derive(Clone)]
pub struct ProgramService {
    clock: Clock,
    participants: Arc<dyn ParticipantRepository>,
    scheduler: Scheduler,
}

impl ProgramService {
    #[must_use]
    pub fn new(
        clock: Clock,
        participants: Arc<dyn ParticipantRepository>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            clock,
            participants,
            scheduler,
        }
    }

    /// Starts (or restarts) the program for a participant.
    ///
    /// Creates the record on first contact. The start date is the
    /// participant's local calendar date of this instant; the step count
    /// resets and the first notification is armed with the short immediate
    /// delay. Returns the first notification's target instant.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError` if the record cannot be persisted or the
    /// timer cannot be armed.
    pub async fn start_program(
        &self,
        id: ParticipantId,
        prefs: NotificationPrefs,
    ) -> Result<Option<DateTime<Utc>>, ProgramError> {
        let _guard = self.scheduler.lock_participant(id).await;

        let now = self.clock.now();
        let mut record = match self.participants.get(id).await? {
            Some(record) => record,
            None => ProgressRecord::new(id, now),
        };
        let start_date = local_date(now, prefs.utc_offset_hours());
        record.begin(start_date, prefs);
        self.participants.upsert(&record).await?;

        let target = self.scheduler.rearm_locked(id, true).await?;
        tracing::info!(participant = %id, start = %start_date, "program started");
        Ok(target)
    }

    /// Confirms the given step and arms the timer for the one after it.
    ///
    /// The step must be exactly the next one in sequence; skips and repeats
    /// are rejected without changing any state. Returns the next
    /// notification's target instant, or `None` when the confirmed step was
    /// the last.
    ///
    /// # Errors
    ///
    /// - `ProgramError::Progress` when no program is running or the step is
    ///   out of order.
    /// - `ProgramError::Storage` / `ProgramError::Scheduler` for
    ///   persistence and arming failures.
    pub async fn confirm_step(
        &self,
        id: ParticipantId,
        step: u8,
    ) -> Result<Option<DateTime<Utc>>, ProgramError> {
        let _guard = self.scheduler.lock_participant(id).await;

        let mut record = self
            .participants
            .get(id)
            .await?
            .ok_or(ProgressError::NotActive)?;
        record.confirm_step(step, self.clock.now())?;
        self.participants.upsert(&record).await?;

        let target = self.scheduler.rearm_locked(id, false).await?;
        tracing::info!(
            participant = %id,
            step,
            completed = record.completed_steps(),
            "step confirmed"
        );
        Ok(target)
    }

    /// Stops the program, keeping the step count on record and canceling
    /// any pending notification.
    ///
    /// Stopping an inactive or unknown participant is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError` if the record cannot be persisted.
    pub async fn stop_program(&self, id: ParticipantId) -> Result<(), ProgramError> {
        let _guard = self.scheduler.lock_participant(id).await;

        if let Some(mut record) = self.participants.get(id).await? {
            record.stop();
            self.participants.upsert(&record).await?;
        }
        // Recomputing against the stopped record cancels the timer.
        self.scheduler.rearm_locked(id, false).await?;
        tracing::info!(participant = %id, "program stopped");
        Ok(())
    }

    /// Read-only snapshot for one participant.
    ///
    /// Unknown participants report as inactive rather than erroring, so
    /// status is safe to ask before any other contact.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::Storage` if the record cannot be loaded.
    pub async fn status(&self, id: ParticipantId) -> Result<ProgramStatus, ProgramError> {
        let Some(record) = self.participants.get(id).await? else {
            return Ok(ProgramStatus {
                state: ProgramState::Inactive,
                completed_steps: 0,
                next_step: None,
                next_fire_utc: None,
                next_fire_local: None,
                timer_armed: false,
            });
        };

        let next_fire_utc =
            next_fire_instant(self.scheduler.schedule(), &record).map_err(SchedulerError::from)?;
        let offset = record.prefs().utc_offset_hours();
        Ok(ProgramStatus {
            state: record.state(),
            completed_steps: record.completed_steps(),
            next_step: record.next_step(),
            next_fire_utc,
            next_fire_local: next_fire_utc.map(|at| local_reading(at, offset)),
            timer_armed: self.scheduler.timers().is_armed(id),
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
