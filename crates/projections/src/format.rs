//! Canonical date rendering shared by every view.

use chrono::{DateTime, NaiveDate, Utc};

/// `YYYY-MM-DD`. Timestamps are converted to their UTC calendar date first.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format_date(at.date_naive())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamp_uses_utc_date() {
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(format_timestamp(late), "2024-03-09");
    }

    #[test]
    fn date_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date), "2024-01-05");
    }
}
