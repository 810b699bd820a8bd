use chrono::{DateTime, NaiveDate, Utc};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
pub const SERIAL_UNIX_OFFSET: f64 = 25569.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Convert a spreadsheet date serial to a UTC instant.
///
/// Example: 44927 → 2023-01-01T00:00:00Z
pub fn serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - SERIAL_UNIX_OFFSET) * MILLIS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Convert a spreadsheet date serial to a calendar date (UTC).
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    serial_to_datetime(serial).map(|dt| dt.date_naive())
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Whole days from `now` until `target`, rounded up.
///
/// A target 12 hours away is 1 day out; one 12 hours past is 0.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = (target - now).num_milliseconds() as f64;
    (delta / MILLIS_PER_DAY).ceil() as i64
}

/// Display form of a date serial: "Jan 1, 2023".
pub fn format_serial(serial: f64) -> Option<String> {
    serial_to_date(serial).map(|d| d.format("%b %-d, %Y").to_string())
}

/// Rounded percentage of `part` in `total`; 0 when `total` is 0.
pub fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}
