use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;

use crate::model::ids::ParticipantId;
use crate::schedule::FINAL_STEP;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("notification hour must be in 0..=23, got {provided}")]
    InvalidNotificationHour { provided: u8 },

    #[error("utc offset must be in -12..=14 hours, got {provided}")]
    InvalidUtcOffset { provided: i8 },

    #[error("completed steps must be at most 50, got {provided}")]
    StepsOutOfRange { provided: u8 },

    #[error("cannot confirm step {attempted}; the next step is {expected}")]
    OutOfOrderStep { attempted: u8, expected: u8 },

    #[error("program is not active")]
    NotActive,

    #[error("program is already complete")]
    AlreadyComplete,
}

//
// ─── PREFERENCES ───────────────────────────────────────────────────────────────
//

/// Hour of day notifications default to when a participant names none.
pub const DEFAULT_NOTIFICATION_HOUR: u8 = 9;

/// Per-participant delivery preferences.
///
/// The offset is a fixed whole-hour distance from UTC supplied once at
/// setup; it is never adjusted for daylight saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPrefs {
    hour: u8,
    utc_offset_hours: i8,
}

impl NotificationPrefs {
    /// Creates validated preferences.
    ///
    /// # Errors
    ///
    /// Returns an error if the hour is outside 0..=23 or the offset outside
    /// -12..=14.
    pub fn new(hour: u8, utc_offset_hours: i8) -> Result<Self, ProgressError> {
        if hour > 23 {
            return Err(ProgressError::InvalidNotificationHour { provided: hour });
        }
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(ProgressError::InvalidUtcOffset {
                provided: utc_offset_hours,
            });
        }
        Ok(Self {
            hour,
            utc_offset_hours,
        })
    }

    /// Local hour of day at which notifications fire.
    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn utc_offset_hours(&self) -> i8 {
        self.utc_offset_hours
    }

    /// The offset as a `chrono` duration, for shifting UTC instants.
    #[must_use]
    pub fn utc_offset(&self) -> Duration {
        Duration::hours(i64::from(self.utc_offset_hours))
    }
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            hour: DEFAULT_NOTIFICATION_HOUR,
            utc_offset_hours: 0,
        }
    }
}

//
// ─── PROGRAM STATE ─────────────────────────────────────────────────────────────
//

/// Lifecycle tag for one participant's pass through the program.
///
/// Derived from the stored record; scheduling code matches on this instead
/// of re-checking which optional fields happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// No start date on record. A stopped program lands back here.
    Inactive,
    /// Started and not yet through the final step.
    Active {
        start_date: NaiveDate,
        completed_steps: u8,
        last_completed_at: Option<DateTime<Utc>>,
    },
    /// Every step confirmed; no further notifications.
    Complete,
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Durable per-participant progress through the program.
///
/// One record per participant, created on first contact and never deleted.
/// Stopping a program clears the start date but keeps the step count;
/// restarting resets the count to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    participant: ParticipantId,
    completed_steps: u8,
    start_date: Option<NaiveDate>,
    last_completed_at: Option<DateTime<Utc>>,
    prefs: NotificationPrefs,
    created_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Creates the blank record stored on first contact.
    #[must_use]
    pub fn new(participant: ParticipantId, created_at: DateTime<Utc>) -> Self {
        Self {
            participant,
            completed_steps: 0,
            start_date: None,
            last_completed_at: None,
            prefs: NotificationPrefs::default(),
            created_at,
        }
    }

    /// Rehydrates a record from stored fields.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::StepsOutOfRange` if the stored step count
    /// exceeds the final step.
    pub fn from_persisted(
        participant: ParticipantId,
        completed_steps: u8,
        start_date: Option<NaiveDate>,
        last_completed_at: Option<DateTime<Utc>>,
        prefs: NotificationPrefs,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if completed_steps > FINAL_STEP {
            return Err(ProgressError::StepsOutOfRange {
                provided: completed_steps,
            });
        }
        Ok(Self {
            participant,
            completed_steps,
            start_date,
            last_completed_at,
            prefs,
            created_at,
        })
    }

    /// Begins (or restarts) the program on the given local calendar date.
    ///
    /// The step count resets to zero and any previous completion stamp is
    /// discarded.
    pub fn begin(&mut self, start_date: NaiveDate, prefs: NotificationPrefs) {
        self.start_date = Some(start_date);
        self.completed_steps = 0;
        self.last_completed_at = None;
        self.prefs = prefs;
    }

    /// Confirms the next step in sequence at the given instant.
    ///
    /// # Errors
    ///
    /// - `NotActive` if no program is running.
    /// - `AlreadyComplete` if the final step is already confirmed.
    /// - `OutOfOrderStep` if `step` is not exactly the step after the
    ///   current count; skips and repeats are both rejected.
    pub fn confirm_step(&mut self, step: u8, at: DateTime<Utc>) -> Result<(), ProgressError> {
        match self.state() {
            ProgramState::Inactive => Err(ProgressError::NotActive),
            ProgramState::Complete => Err(ProgressError::AlreadyComplete),
            ProgramState::Active {
                completed_steps, ..
            } => {
                let expected = completed_steps + 1;
                if step != expected {
                    return Err(ProgressError::OutOfOrderStep {
                        attempted: step,
                        expected,
                    });
                }
                self.completed_steps = expected;
                self.last_completed_at = Some(at);
                Ok(())
            }
        }
    }

    /// Stops the program, keeping the step count on record.
    ///
    /// Stopping an inactive record is a no-op.
    pub fn stop(&mut self) {
        self.start_date = None;
    }

    /// Derives the lifecycle tag from the stored fields.
    #[must_use]
    pub fn state(&self) -> ProgramState {
        match self.start_date {
            None => ProgramState::Inactive,
            Some(_) if self.completed_steps >= FINAL_STEP => ProgramState::Complete,
            Some(start_date) => ProgramState::Active {
                start_date,
                completed_steps: self.completed_steps,
                last_completed_at: self.last_completed_at,
            },
        }
    }

    /// The step the next notification announces, when one is due.
    #[must_use]
    pub fn next_step(&self) -> Option<u8> {
        match self.state() {
            ProgramState::Active {
                completed_steps, ..
            } => Some(completed_steps + 1),
            ProgramState::Inactive | ProgramState::Complete => None,
        }
    }

    // Accessors
    #[must_use]
    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    #[must_use]
    pub fn completed_steps(&self) -> u8 {
        self.completed_steps
    }

    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    #[must_use]
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.last_completed_at
    }

    #[must_use]
    pub fn prefs(&self) -> NotificationPrefs {
        self.prefs
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
