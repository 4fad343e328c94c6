//! Timetable projection onto calendar dates.
//!
//! Timetables list a time of day per stop. Overnight routes run through
//! midnight, so projecting "20:00, 21:00, 01:00" onto a travel date must
//! place the last stop on the following day.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{ClockTime, Route, StopTime, TimeError};

/// Shown in place of a time that cannot be attributed to a stop.
pub const UNKNOWN_TIME: &str = "--:--";

/// Project a canonical time list onto calendar dates.
///
/// Walks the times in canonical order starting from `base_date`. Whenever
/// an entry's hour is less than the previous entry's hour, the running
/// date advances by one day. The first entry is always on `base_date`.
///
/// # Examples
///
/// ```
/// use bus_server::domain::ClockTime;
/// use bus_server::timetable::project_times;
/// use chrono::NaiveDate;
///
/// let d = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
/// let times: Vec<ClockTime> = ["20:00", "21:00", "01:00", "04:00"]
///     .iter().map(|t| ClockTime::parse_hhmm(t).unwrap()).collect();
///
/// let projected = project_times(&times, d).unwrap();
/// let next = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
/// let dates: Vec<_> = projected.iter().map(|t| t.date()).collect();
/// assert_eq!(dates, [d, d, next, next]);
/// ```
pub fn project_times(
    times: &[ClockTime],
    base_date: NaiveDate,
) -> Result<Vec<StopTime>, TimeError> {
    let mut result = Vec::with_capacity(times.len());
    let mut current_date = base_date;
    let mut prev_hour: Option<u32> = None;

    for time in times {
        if let Some(prev) = prev_hour
            && time.hour() < prev
        {
            current_date = current_date
                .succ_opt()
                .ok_or_else(TimeError::date_overflow)?;
        }
        result.push(time.on(current_date));
        prev_hour = Some(time.hour());
    }

    Ok(result)
}

/// Projected times for a set of displayed stops.
///
/// Each displayed stop is matched to its canonical timetable entry by
/// name, never by position, because display order may be reversed or
/// reduced. A stop that cannot be matched gets `None`.
///
/// If the route's timetable does not have exactly one entry per stop,
/// every stop gets `None` and no date arithmetic is attempted.
pub fn align(route: &Route, display: &[String], base_date: NaiveDate) -> Vec<Option<StopTime>> {
    if !route.has_exact_timetable() {
        debug!(
            route = %route.id(),
            stops = route.stops().len(),
            times = route.times().len(),
            "timetable length mismatch, showing placeholders"
        );
        return vec![None; display.len()];
    }

    let projected = match project_times(route.times(), base_date) {
        Ok(projected) => projected,
        Err(e) => {
            debug!(route = %route.id(), error = %e, "projection failed");
            return vec![None; display.len()];
        }
    };

    display
        .iter()
        .map(|name| route.stop_index(name).map(|i| projected[i]))
        .collect()
}
