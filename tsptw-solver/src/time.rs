//! Seconds-of-day helpers.
//!
//! Time windows and start times are carried as seconds since midnight.
//! Schedules are reported as `HH:MM:SS` with the hour wrapping at 24.

use crate::error::{SolverError, SolverResult};
use chrono::{NaiveTime, Timelike};

const SECONDS_PER_DAY: u32 = 86_400;

/// Parse `"HH:MM"` or `"HH:MM:SS"` into seconds since midnight.
pub fn parse_time_of_day(text: &str) -> SolverResult<u32> {
    let text = text.trim();
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| SolverError::Parse {
            message: format!("invalid time of day '{}': {}", text, e),
        })?;
    Ok(time.num_seconds_from_midnight())
}

/// Render a timestamp (or a duration) in seconds as `HH:MM:SS`.
///
/// Fractional seconds are truncated and the hour wraps at 24, so a wait of
/// 25 hours renders as `01:00:00`.
pub fn format_seconds(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        (seconds as u64 % SECONDS_PER_DAY as u64) as u32
    } else {
        0
    };
    match NaiveTime::from_num_seconds_from_midnight_opt(whole, 0) {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => "00:00:00".to_string(),
    }
}

/// Render a duration in seconds as `"HHh MMm"` (hours do not wrap).
pub fn format_duration_hm(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}h {:02}m", whole / 3600, (whole % 3600) / 60)
}
