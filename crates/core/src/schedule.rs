use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("no pacing entry for step {step}; steps run 1..=50")]
    StepOutOfRange { step: u8 },
}

//
// ─── PACING TABLE ──────────────────────────────────────────────────────────────
//

/// Last step of the program.
pub const FINAL_STEP: u8 = 50;

/// Cumulative day offsets for steps 11..=50.
///
/// Steps 1..=10 land one per day; from step 11 the gaps widen from two days
/// to five, tapering the program to roughly weekly by the end. Hand-tuned
/// pacing, not derivable from a formula.
const LATE_STEP_OFFSETS: [u16; 40] = [
    12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 33, 36, 39, 42, 45, 48, 51, 54, 58, 62, 66, 70, 74,
    78, 82, 87, 92, 97, 102, 107, 112, 117, 122, 127, 132, 137, 142, 147, 152, 157,
];

/// Pacing table mapping each step to its day offset from program start.
///
/// Built once at startup and handed to the scheduler as a plain value; it
/// carries no mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    late_offsets: [u16; 40],
}

impl Schedule {
    /// The standard 50-step pacing.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            late_offsets: LATE_STEP_OFFSETS,
        }
    }

    /// Days from program start at which `step` is scheduled.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::StepOutOfRange` for steps outside 1..=50.
    pub fn day_offset(&self, step: u8) -> Result<u16, ScheduleError> {
        match step {
            1..=10 => Ok(u16::from(step)),
            11..=FINAL_STEP => Ok(self.late_offsets[usize::from(step) - 11]),
            _ => Err(ScheduleError::StepOutOfRange { step }),
        }
    }

    /// Days between confirming `completed` and announcing the step after it.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::StepOutOfRange` if either step falls outside
    /// the table, which for in-range input only happens at the final step.
    pub fn wait_days(&self, completed: u8) -> Result<u16, ScheduleError> {
        let current = self.day_offset(completed)?;
        let next = self.day_offset(completed + 1)?;
        Ok(next - current)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
