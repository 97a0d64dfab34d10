//! Duration and date parsing
//!
//! Durations (config values, grace periods): `45s`, `5m`, `1h`, `2d`, or a bare
//! number of seconds.
//!
//! Event dates (the `findAllEvents` filter): `today`, `tomorrow`, a weekday
//! name for its next occurrence, or `YYYY-MM-DD`.

use std::time::Duration;

use chrono::{Datelike, Days, Local, NaiveDate, Weekday};

use crate::error::{PunchlineError, Result};

/// Parse a duration such as `30s`, `5m` or `1h`
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    parse_duration_inner(&s).ok_or_else(|| {
        PunchlineError::InvalidArgument(format!(
            "Invalid duration: '{s}'. Use formats like: 30s, 5m, 1h, 2d"
        ))
    })
}

fn parse_duration_inner(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let split_idx = s.find(|c: char| !c.is_ascii_digit())?;
    let (num_str, unit) = s.split_at(split_idx);
    let num: u64 = num_str.parse().ok()?;

    let secs = match unit.trim() {
        "ms" => return Some(Duration::from_millis(num)),
        "s" | "sec" | "secs" | "second" | "seconds" => num,
        "m" | "min" | "mins" | "minute" | "minutes" => num.checked_mul(60)?,
        "h" | "hr" | "hrs" | "hour" | "hours" => num.checked_mul(3600)?,
        "d" | "day" | "days" => num.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Render a duration the way [`parse_duration`] reads it
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if duration.subsec_millis() != 0 || secs == 0 && !duration.is_zero() {
        return format!("{}ms", duration.as_millis());
    }
    match secs {
        0 => "0s".to_string(),
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

/// Parse an event date filter relative to the local calendar
pub fn parse_event_date(s: &str) -> Result<NaiveDate> {
    parse_event_date_from(s, Local::now().date_naive())
}

fn parse_event_date_from(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let s = s.trim().to_lowercase();

    let date = match s.as_str() {
        "today" | "tonight" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        other => match other.parse::<Weekday>() {
            Ok(weekday) => Some(next_weekday(today, weekday)),
            Err(_) => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
        },
    };

    date.ok_or_else(|| {
        PunchlineError::InvalidArgument(format!(
            "Invalid date: '{s}'. Use today, tomorrow, a weekday name, or YYYY-MM-DD"
        ))
    })
}

/// The next date falling on `weekday`, today included
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    today + chrono::Duration::days(i64::from(ahead))
}
