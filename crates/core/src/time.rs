use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

// ─── Participant-local readings ────────────────────────────────────────────────

/// Wall-clock reading of a UTC instant at a fixed whole-hour offset.
///
/// Participants store a nominal offset instead of a named timezone, so the
/// shift is plain arithmetic with no DST rules.
#[must_use]
pub fn local_reading(at: DateTime<Utc>, utc_offset_hours: i8) -> NaiveDateTime {
    (at + Duration::hours(i64::from(utc_offset_hours))).naive_utc()
}

/// Calendar date of a UTC instant at a fixed whole-hour offset.
#[must_use]
pub fn local_date(at: DateTime<Utc>, utc_offset_hours: i8) -> NaiveDate {
    local_reading(at, utc_offset_hours).date()
}

// ─── Test helpers ──────────────────────────────────────────────────────────────

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_reports_fixed_instant() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
    }

    #[test]
    fn advance_moves_fixed_clock_only() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(2));
    }

    #[test]
    fn local_date_crosses_midnight_forward() {
        // 22:13 UTC is already the next day at +3.
        let date = local_date(fixed_now(), 3);
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
    }

    #[test]
    fn local_date_crosses_midnight_backward() {
        // 22:13 UTC on the 14th is still the 14th at -5.
        let date = local_date(fixed_now(), -5);
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
    }

    #[test]
    fn local_reading_shifts_by_offset() {
        let reading = local_reading(fixed_now(), 5);
        assert_eq!(reading, (fixed_now() + Duration::hours(5)).naive_utc());
    }
}
