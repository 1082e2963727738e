use chrono::{NaiveDate, NaiveDateTime};

/// Storage format for every date column.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Storage format for timestamp columns (`last_updated`, `last_attempt_time`).
pub const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted input formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2025-03-12
    "%d-%m-%Y",  // 12-03-2025
    "%m-%d-%Y",  // 03-12-2025
    "%Y/%m/%d",  // 2025/03/12
    "%d/%m/%Y",  // 12/03/2025
    "%m/%d/%Y",  // 03/12/2025
    "%B %d, %Y", // March 12, 2025
    "%d %B %Y",  // 12 March 2025
    "%b %d, %Y", // Mar 12, 2025
    "%Y%m%d",    // 20250312
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S"];

/// Parse a date written in any of the accepted formats.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Normalize a date string to `YYYY-MM-DD`.
///
/// Input that cannot be parsed (including an empty string) is returned unchanged.
pub fn normalize_date(input: &str) -> String {
    match parse_date(input) {
        Some(date) => format_date(date),
        None => input.to_string(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP).to_string()
}

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Current local time.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Round a monetary value to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
