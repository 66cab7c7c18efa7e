//! Date argument parsing.

use chrono::{Local, NaiveDate};

/// Formats accepted on the command line.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parses a date in `YYYY-MM-DD`, `YYYY/MM/DD` or `YYYYMMDD` format.
///
/// # Errors
///
/// Returns a message naming the accepted formats if `text` matches none.
pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| {
            format!("Invalid date format: '{text}'. Expected YYYY-MM-DD, YYYY/MM/DD, or YYYYMMDD.")
        })
}

/// Parses an optional date argument, defaulting to today (local time).
pub fn parse_date_or_today(text: Option<&str>) -> Result<NaiveDate, String> {
    match text {
        Some(text) if !text.trim().is_empty() => parse_date(text),
        _ => Ok(today()),
    }
}

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Compact `YYYYMMDD` form used in artifact file names.
pub fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
