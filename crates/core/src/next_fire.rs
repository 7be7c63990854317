use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

use crate::model::{NotificationPrefs, ProgramState, ProgressRecord};
use crate::schedule::{Schedule, ScheduleError};
use crate::time::local_date;

/// Computes the UTC instant of the participant's next notification.
///
/// Returns `Ok(None)` when no further notification is due: the program is
/// inactive or every step is confirmed. The function performs no I/O and is
/// deterministic in its inputs.
///
/// The first notification goes out on the start date itself. After that the
/// wait is the pacing-table gap between the confirmed step and the next one,
/// counted from the local calendar date of the last confirmation (falling
/// back to the start date if that stamp is missing, a recovery path only).
///
/// # Errors
///
/// Returns `ScheduleError` if the pacing table has no entry for a step it
/// should cover. Callers treat that as a configuration fault and withhold
/// the notification rather than fire at a wrong time.
pub fn next_fire_instant(
    schedule: &Schedule,
    record: &ProgressRecord,
) -> Result<Option<DateTime<Utc>>, ScheduleError> {
    let (start_date, completed_steps, last_completed_at) = match record.state() {
        ProgramState::Inactive | ProgramState::Complete => return Ok(None),
        ProgramState::Active {
            start_date,
            completed_steps,
            last_completed_at,
        } => (start_date, completed_steps, last_completed_at),
    };

    let prefs = record.prefs();
    let (base_date, wait_days) = if completed_steps == 0 {
        (start_date, 0)
    } else {
        let wait = schedule.wait_days(completed_steps)?;
        let base = last_completed_at
            .map_or(start_date, |at| local_date(at, prefs.utc_offset_hours()));
        (base, wait)
    };

    let target_date = base_date + Duration::days(i64::from(wait_days));
    Ok(Some(at_notification_hour(target_date, prefs)))
}

/// Pins a local calendar date to the preferred hour and shifts it to UTC.
fn at_notification_hour(date: chrono::NaiveDate, prefs: NotificationPrefs) -> DateTime<Utc> {
    // Build the wall-clock reading first; subtracting the offset then yields
    // the true UTC instant.
    let wall = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        + Duration::hours(i64::from(prefs.hour()));
    wall - prefs.utc_offset()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParticipantId;
    use crate::time::fixed_now;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn active_record(
        completed_steps: u8,
        start: NaiveDate,
        last_completed_at: Option<DateTime<Utc>>,
        hour: u8,
        offset: i8,
    ) -> ProgressRecord {
        ProgressRecord::from_persisted(
            ParticipantId::new(7),
            completed_steps,
            Some(start),
            last_completed_at,
            NotificationPrefs::new(hour, offset).unwrap(),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn inactive_record_has_no_fire() {
        let schedule = Schedule::standard();
        let record = ProgressRecord::new(ParticipantId::new(7), fixed_now());
        assert_eq!(next_fire_instant(&schedule, &record).unwrap(), None);
    }

    #[test]
    fn complete_record_has_no_fire() {
        let schedule = Schedule::standard();
        let record = active_record(50, date(2024, 1, 1), Some(fixed_now()), 9, 0);
        assert_eq!(next_fire_instant(&schedule, &record).unwrap(), None);
    }

    #[test]
    fn first_notification_fires_on_start_date() {
        // Start on D with hour 9 at +3: fires D 06:00 UTC.
        let schedule = Schedule::standard();
        let record = active_record(0, date(2024, 3, 10), None, 9, 3);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        assert_eq!(fire, Some(utc(2024, 3, 10, 6)));
    }

    #[test]
    fn daily_gap_after_step_five() {
        // Step 5 confirmed on D: next fires (D+1) 09:00 UTC at offset 0.
        let schedule = Schedule::standard();
        let record = active_record(5, date(2024, 3, 1), Some(utc(2024, 3, 15, 14)), 9, 0);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        assert_eq!(fire, Some(utc(2024, 3, 16, 9)));
    }

    #[test]
    fn gap_widens_after_step_ten() {
        // Offsets 10 -> 12, so the wait is two days.
        let schedule = Schedule::standard();
        let record = active_record(10, date(2024, 3, 1), Some(utc(2024, 3, 20, 11)), 9, 0);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        assert_eq!(fire, Some(utc(2024, 3, 22, 9)));
    }

    #[test]
    fn missing_completion_stamp_falls_back_to_start_date() {
        let schedule = Schedule::standard();
        let record = active_record(3, date(2024, 3, 1), None, 9, 0);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        // wait = offset(4) - offset(3) = 1 day from the start date
        assert_eq!(fire, Some(utc(2024, 3, 2, 9)));
    }

    #[test]
    fn negative_offset_pushes_fire_later_in_utc() {
        let schedule = Schedule::standard();
        let record = active_record(0, date(2024, 3, 10), None, 9, -5);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        assert_eq!(fire, Some(utc(2024, 3, 10, 14)));
    }

    #[test]
    fn completion_near_local_midnight_uses_local_date() {
        // 22:00 UTC on the 15th is already the 16th at +13; the next fire
        // counts from the 16th.
        let schedule = Schedule::standard();
        let record = active_record(1, date(2024, 3, 10), Some(utc(2024, 3, 15, 22)), 9, 13);
        let fire = next_fire_instant(&schedule, &record).unwrap();
        // target local: 17th 09:00 at +13 = 16th 20:00 UTC
        assert_eq!(fire, Some(utc(2024, 3, 16, 20)));
    }

    #[test]
    fn calculator_is_deterministic() {
        let schedule = Schedule::standard();
        let record = active_record(12, date(2024, 2, 1), Some(utc(2024, 2, 20, 10)), 21, 5);
        let first = next_fire_instant(&schedule, &record).unwrap();
        let second = next_fire_instant(&schedule, &record).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn successive_fires_are_strictly_later_across_the_whole_program() {
        let schedule = Schedule::standard();
        let mut record = ProgressRecord::new(ParticipantId::new(7), fixed_now());
        record.begin(date(2024, 1, 1), NotificationPrefs::new(9, 2).unwrap());

        let mut previous: Option<DateTime<Utc>> = None;
        for step in 1..=50 {
            let fire = next_fire_instant(&schedule, &record)
                .unwrap()
                .unwrap_or_else(|| panic!("step {step} should have a fire instant"));
            if let Some(prev) = previous {
                assert!(fire > prev, "step {step}: {fire} not after {prev}");
            }
            previous = Some(fire);
            // Confirm at the instant the notification fired.
            record.confirm_step(step, fire).unwrap();
        }

        assert_eq!(next_fire_instant(&schedule, &record).unwrap(), None);
    }
}
