//! Permissive date parsing for user-supplied range boundaries.
//!
//! Callers type dates in whatever shape their spreadsheet or phone produced,
//! so strict formats are tried in a fixed order before an ISO datetime
//! fallback. Everything persisted is a calendar date.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use service_core::error::AppError;

/// Strict formats, tried in order. Day-first wins ambiguous slashed input.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%Y-%m-%d"];

pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // Fallback: full datetime forms, truncated to the calendar date.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }

    None
}

/// Parse a required date field, surfacing the raw input on failure.
pub fn parse_required_date(input: &str) -> Result<NaiveDate, AppError> {
    parse_flexible_date(input).ok_or_else(|| AppError::InvalidDate(input.to_string()))
}

pub fn format_date_readable(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

pub fn format_datetime_readable(dt: &DateTime<chrono::Utc>) -> String {
    dt.format("%d-%m-%Y %H:%M").to_string()
}
