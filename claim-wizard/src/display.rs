//! Display formatting shared by the result mapper and claim listings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Placeholder shown for any field the service did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `2024-03-15` becomes `Mar 15, 2024`. Text that is not a date is returned as is.
pub fn format_date(raw: &str) -> String {
    match parse_datetime(raw) {
        Some(dt) => dt.format("%b %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

/// Date plus time of day, used for claim creation timestamps.
pub fn format_timestamp(raw: &str) -> String {
    match parse_datetime(raw) {
        Some(dt) => dt.format("%b %-d, %Y, %H:%M").to_string(),
        None => raw.to_string(),
    }
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:.3}")
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}
