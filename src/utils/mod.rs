pub mod stats;

use chrono::NaiveDate;

/// Parse a complete ISO calendar date (YYYY-MM-DD).
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Current calendar date in local time.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
