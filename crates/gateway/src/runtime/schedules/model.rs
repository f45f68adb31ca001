//! Next-fire computation for a [`ScheduledEmailTask`]'s `recurrence`.
//!
//! `Recurrence`'s vocabulary (`daily|weekly|monthly|yearly` plus an optional
//! `time`/`weekday`) has no day-of-month or month field, so it can't be
//! losslessly rewritten as a general 5-field cron expression the way a
//! fuller scheduler's cron strings can (`runtime/schedules/cron.rs` is kept
//! for that richer case, unused by this narrower one). Instead this anchors
//! monthly/yearly recurrence on the task's original `scheduled_at` (or
//! `created_at`) day, matching the "same day each period" reading a user
//! would expect from `recurrence: {frequency: "monthly"}`.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use lg_domain::schedule::{Recurrence, RecurrenceFrequency};

fn weekday_from_index(i: u8) -> Weekday {
    match i % 7 {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Compute the next occurrence strictly after `after`, anchored on `anchor`
/// (the task's `scheduled_at` or `created_at`) for frequencies that need a
/// fixed day.
pub fn next_occurrence(
    recurrence: &Recurrence,
    anchor: DateTime<Utc>,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let time = recurrence.time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());

    let candidate = match recurrence.frequency {
        RecurrenceFrequency::Daily => {
            let mut day = after.date_naive();
            loop {
                let dt = day.and_time(time).and_utc();
                if dt > after {
                    break dt;
                }
                day = day.succ_opt()?;
            }
        }
        RecurrenceFrequency::Weekly => {
            let target = recurrence.weekday.map(weekday_from_index).unwrap_or_else(|| anchor.weekday());
            let mut day = after.date_naive();
            loop {
                if day.weekday() == target {
                    let dt = day.and_time(time).and_utc();
                    if dt > after {
                        break dt;
                    }
                }
                day = day.succ_opt()?;
            }
        }
        RecurrenceFrequency::Monthly => {
            let anchor_day = anchor.day();
            let mut year = after.year();
            let mut month = after.month();
            loop {
                if let Some(date) = chrono::NaiveDate::from_ymd_opt(year, month, anchor_day.min(days_in_month(year, month))) {
                    let dt = date.and_time(time).and_utc();
                    if dt > after {
                        break dt;
                    }
                }
                month += 1;
                if month > 12 {
                    month = 1;
                    year += 1;
                }
            }
        }
        RecurrenceFrequency::Yearly => {
            let anchor_month = anchor.month();
            let anchor_day = anchor.day();
            let mut year = after.year();
            loop {
                if let Some(date) = chrono::NaiveDate::from_ymd_opt(year, anchor_month, anchor_day.min(days_in_month(year, anchor_month))) {
                    let dt = date.and_time(time).and_utc();
                    if dt > after {
                        break dt;
                    }
                }
                year += 1;
            }
        }
    };
    Some(Utc.from_utc_datetime(&candidate.naive_utc()))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap();
    let this_month_first = chrono::NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    (next_month_first - this_month_first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recurrence(freq: RecurrenceFrequency, time: Option<NaiveTime>, weekday: Option<u8>) -> Recurrence {
        Recurrence { frequency: freq, time, weekday }
    }

    #[test]
    fn daily_advances_to_next_day_when_time_already_passed() {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let next = next_occurrence(&recurrence(RecurrenceFrequency::Daily, Some(time), None), anchor, after).unwrap();
        assert_eq!(next.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
    }

    #[test]
    fn weekly_lands_on_requested_weekday() {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap(); // Monday
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        // weekday 3 = Wednesday
        let next = next_occurrence(&recurrence(RecurrenceFrequency::Weekly, Some(time), Some(3)), anchor, after).unwrap();
        assert_eq!(next.weekday(), Weekday::Wed);
    }

    #[test]
    fn monthly_anchors_on_original_day_of_month() {
        let anchor = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        // February has 28 days in 2026 — clamp to last day.
        let next = next_occurrence(&recurrence(RecurrenceFrequency::Monthly, None, None), anchor, after).unwrap();
        assert_eq!(next.day(), 28);
        assert_eq!(next.month(), 2);
    }

    #[test]
    fn yearly_repeats_same_month_and_day() {
        let anchor = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = next_occurrence(&recurrence(RecurrenceFrequency::Yearly, None, None), anchor, after).unwrap();
        assert_eq!(next.month(), 3);
        assert_eq!(next.day(), 15);
        assert_eq!(next.year(), 2026);
    }
}
