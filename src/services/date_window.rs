//! Day bounds and ordering helpers shared by the selection rule, list filters
//! and the daily broadcast.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Returns `(start, end)` of the calendar day `date` falls in:
/// `00:00:00` and `23:59:59` of that same day, in the input's own clock.
pub fn day_range(date: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.date().and_time(NaiveTime::MIN);
    (start, start + Duration::seconds(86_399))
}

/// Same as [`day_range`] for a bare date.
pub fn day_range_for(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    day_range(date.and_time(NaiveTime::MIN))
}

/// Strict `low < value < high`.
///
/// Returns `None` instead of an answer when any pair cannot be ordered
/// (for example a `NaN`, or a number against text in [`Scalar`]).
pub fn is_between<T: PartialOrd + ?Sized>(low: &T, value: &T, high: &T) -> Option<bool> {
    let above_low = low.partial_cmp(value)?;
    let below_high = value.partial_cmp(high)?;
    Some(above_low == Ordering::Less && below_high == Ordering::Less)
}

/// Loosely typed value for ordering checks over heterogeneous input.
/// Values of different kinds are not comparable with each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
            (Scalar::Text(a), Scalar::Text(b)) => a.partial_cmp(b),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(v: NaiveDateTime) -> Self {
        Scalar::Timestamp(v)
    }
}

/// Wall-clock time of the server, which is the clock menus are scheduled in.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Converts a stored instant to the server's wall clock.
pub fn to_local(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&Local).naive_local()
}

/// Converts a server wall-clock time to an instant for storage queries.
/// Ambiguous times (DST fold) resolve to the earliest instant.
pub fn local_to_utc(wall_clock: NaiveDateTime) -> anyhow::Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&wall_clock)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| anyhow::anyhow!("{wall_clock} does not exist in the local timezone"))
}

/// Local day bounds of `date`, as UTC instants for `BETWEEN` queries.
pub fn utc_day_bounds(date: NaiveDate) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = day_range_for(date);
    Ok((local_to_utc(start)?, local_to_utc(end)?))
}
