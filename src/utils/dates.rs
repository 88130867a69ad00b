//! Date and time utilities

use chrono::{DateTime, Local, TimeZone, Utc};

/// Current Unix timestamp
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Format a timestamp in local time the way `ctime(3)` does,
/// e.g. "Mon Oct  5 14:03:09 2026"
pub fn format_ctime(timestamp: i64) -> String {
    let dt = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Local::now);
    format_ctime_in(&dt)
}

fn format_ctime_in<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Convert timestamp to relative time string (e.g., "2 hours ago")
pub fn timestamp_to_relative(timestamp: i64) -> String {
    let dt = DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    chrono_humanize::HumanTime::from(dt).to_string()
}
