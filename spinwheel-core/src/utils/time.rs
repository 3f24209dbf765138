// File: spinwheel-core/src/utils/time.rs

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::Error;

/// `(month, year)` of the given instant, matching the monthly_usage key
/// column order.
pub fn month_year(at: DateTime<Utc>) -> (i32, i32) {
    (at.month() as i32, at.year())
}

/// Return the next month. E.g. next_month(2025, 12) => (2026, 1)
pub fn next_month(year: i32, month: i32) -> (i32, i32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Return the previous month. E.g. previous_month(2026, 1) => (2025, 12)
pub fn previous_month(year: i32, month: i32) -> (i32, i32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Midnight UTC on the first day of the given month.
pub fn month_start(year: i32, month: i32) -> Result<DateTime<Utc>, Error> {
    Utc.with_ymd_and_hms(year, month as u32, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::Parse(format!("invalid month: {:04}-{:02}", year, month)))
}

/// Whole days until the first day of next month, any partial day rounded up.
pub fn days_until_next_month(at: DateTime<Utc>) -> Result<i64, Error> {
    let (month, year) = month_year(at);
    let (next_year, next) = next_month(year, month);
    let rollover = month_start(next_year, next)?;
    let seconds = (rollover - at).num_seconds();
    Ok((seconds + 86_399) / 86_400)
}
