use chrono::{NaiveDate, NaiveDateTime};

use habitual_types::TimeOfDay;

/// Whether a habit should be reminded at local instant `now`.
///
/// Due iff the wall-clock minute of `now` equals `time_of_day` and either the
/// habit was never served or at least `periodicity_days` whole calendar days
/// separate the last serving date from today. Both instants must already be in
/// the same local zone.
///
/// A minute that passes without a cycle is not caught up later.
pub fn is_due(
    now: NaiveDateTime,
    time_of_day: TimeOfDay,
    periodicity_days: u8,
    last_served_at: Option<NaiveDateTime>,
) -> bool {
    if !time_of_day.matches(now.time()) {
        return false;
    }

    match last_served_at {
        None => true,
        Some(last) => days_elapsed(last.date(), now.date()) >= i64::from(periodicity_days),
    }
}

/// Whole calendar days from `from` to `to`. Negative if `from` is later.
pub fn days_elapsed(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
