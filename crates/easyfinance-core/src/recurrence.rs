//! Recurrence calculator
//!
//! Recurring templates repeat on fixed-length periods (7, 15 or 30 days)
//! counted from their start timestamp. A period boundary is
//! `start + n * interval`. An occurrence becomes due when the current time
//! falls inside the generation window that opens at the most recent
//! boundary; its canonical timestamp is that boundary truncated to local
//! midnight.
//!
//! All functions are generic over the time zone so callers can evaluate in
//! `Local` while tests pin a fixed zone.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};

use crate::models::RecurrenceType;

/// One day in milliseconds
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Default length of the generation window after each boundary
pub const DEFAULT_WINDOW_MS: i64 = DAY_MS;

/// Most recent boundary at or before `now`, or `None` before the start
pub fn last_boundary<Tz: TimeZone>(
    now: &DateTime<Tz>,
    start: &DateTime<Tz>,
    recurrence: RecurrenceType,
) -> Option<DateTime<Tz>> {
    let elapsed = now.timestamp_millis() - start.timestamp_millis();
    if elapsed < 0 {
        return None;
    }
    let interval = recurrence.interval_ms();
    let periods = elapsed / interval;
    Some(start.clone() + Duration::milliseconds(periods * interval))
}

/// Occurrence due at `now` using the default 24-hour window
pub fn due_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    start: &DateTime<Tz>,
    recurrence: RecurrenceType,
) -> Option<DateTime<Tz>> {
    due_occurrence_within(now, start, recurrence, DEFAULT_WINDOW_MS)
}

/// Occurrence due at `now` when the window after each boundary lasts
/// `window_ms`. Returns the boundary truncated to local midnight.
///
/// A boundary whose window has already closed is not reported; callers that
/// want missed boundaries use [`boundaries_until`].
pub fn due_occurrence_within<Tz: TimeZone>(
    now: &DateTime<Tz>,
    start: &DateTime<Tz>,
    recurrence: RecurrenceType,
    window_ms: i64,
) -> Option<DateTime<Tz>> {
    let boundary = last_boundary(now, start, recurrence)?;
    let since_boundary = now.timestamp_millis() - boundary.timestamp_millis();
    if since_boundary < window_ms {
        Some(local_midnight(&boundary))
    } else {
        None
    }
}

/// Every boundary from `start` up to and including `now`, each truncated to
/// local midnight
pub fn boundaries_until<Tz: TimeZone>(
    now: &DateTime<Tz>,
    start: &DateTime<Tz>,
    recurrence: RecurrenceType,
) -> Vec<DateTime<Tz>> {
    let Some(last) = last_boundary(now, start, recurrence) else {
        return Vec::new();
    };
    let interval = recurrence.interval_ms();
    let count = (last.timestamp_millis() - start.timestamp_millis()) / interval;

    (0..=count)
        .map(|n| local_midnight(&(start.clone() + Duration::milliseconds(n * interval))))
        .collect()
}

/// Midnight at the start of the local day containing `at`
///
/// Falls back to `at` itself when midnight does not exist in the zone
/// (a DST gap starting at 00:00).
pub fn local_midnight<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<Tz> {
    let naive = at.date_naive().and_time(NaiveTime::MIN);
    at.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| at.clone())
}
