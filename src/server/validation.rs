use chrono::{NaiveDate, NaiveTime};

use crate::server::response::ApiError;
use crate::types::hhmm;

/// Parses a `YYYY-MM-DD` date. Bad input is a 422.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::unprocessable(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

/// Like [`parse_date`], treating absent or blank values as `None`.
pub fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_date(field, raw).map(Some),
        None => Ok(None),
    }
}

/// Parses an `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, ApiError> {
    hhmm::parse(raw)
        .ok_or_else(|| ApiError::unprocessable(format!("{field} must be a time in HH:MM format")))
}

/// Offset cursors are the stringified row offset of the next page.
pub fn parse_offset_cursor(cursor: Option<&str>) -> Result<i64, ApiError> {
    match cursor.filter(|c| !c.is_empty()) {
        Some(c) => c
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| ApiError::bad_request("Invalid cursor")),
        None => Ok(0),
    }
}

/// Blank query parameters count as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
