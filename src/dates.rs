use anyhow::{anyhow, Context, Result};
use chrono::prelude::*;

pub const DAY_FORMAT: &str = "%Y.%m.%d";

const SECONDS_PER_DAY: i64 = 86400;

/// Formats a unix timestamp (seconds, UTC) as "YYYY.MM.DD".
pub fn format_day(unix_secs: i64) -> Result<String> {
    let datetime = DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", unix_secs))?;
    Ok(datetime.format(DAY_FORMAT).to_string())
}

/// Parses "YYYY.MM.DD" into the unix timestamp of that day's midnight (UTC).
pub fn parse_day(day: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(day, DAY_FORMAT)
        .with_context(|| format!("Invalid date {:?}, expected YYYY.MM.DD", day))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

/// Rewrites a day in zero-padded form, so string order is date order.
pub fn canonical_day(day: &str) -> Result<String> {
    format_day(parse_day(day)?)
}

pub fn days_ago(days: i64) -> i64 {
    days_ago_from(Utc::now(), days)
}

pub fn days_ago_from(now: DateTime<Utc>, days: i64) -> i64 {
    (now - chrono::Duration::days(days)).timestamp()
}

/// Whole days elapsed between `unix_secs` and now.
pub fn days_since(unix_secs: i64) -> i64 {
    days_since_from(Utc::now(), unix_secs)
}

pub fn days_since_from(now: DateTime<Utc>, unix_secs: i64) -> i64 {
    (now.timestamp() - unix_secs).div_euclid(SECONDS_PER_DAY)
}
