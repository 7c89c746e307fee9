//! Alert date values: `year_offset * 1000 + day_of_year`.
//!
//! Year offsets count from 2000 and days are zero-based, so `15000` is
//! 2015-01-01 and `16365` is 2016-12-31.

use chrono::{Datelike, NaiveDate};

use crate::{AlertError, AlertResult};

/// Calendar year that year offset 0 refers to.
pub const BASE_YEAR: i32 = 2000;

/// Convert a calendar date to its alert date value.
pub fn date_value_from_date(date: NaiveDate) -> AlertResult<u32> {
    let offset = date.year() - BASE_YEAR;
    if !(0..=4_000).contains(&offset) {
        return Err(AlertError::InvalidDate(format!(
            "{} is outside the encodable year range",
            date
        )));
    }
    Ok(offset as u32 * 1000 + date.ordinal0())
}

/// Convert an alert date value back to a calendar date.
pub fn date_from_date_value(value: u32) -> AlertResult<NaiveDate> {
    let year = BASE_YEAR + (value / 1000) as i32;
    let day = value % 1000;
    NaiveDate::from_yo_opt(year, day + 1).ok_or_else(|| {
        AlertError::InvalidDate(format!("{} has no day {} in year {}", value, day, year))
    })
}

/// Parse either an ISO date (`2016-03-01`) or a raw date value (`16060`).
pub fn parse_date_value(s: &str) -> AlertResult<u32> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date_value_from_date(date);
    }
    let value: u32 = s
        .parse()
        .map_err(|_| AlertError::InvalidDate(s.to_string()))?;
    // Validate that the value names a real day
    date_from_date_value(value)?;
    Ok(value)
}
