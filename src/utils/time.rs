//! Time utilities: epoch-millisecond helpers, duration formatting, parsing.
//! The engine stores every instant as milliseconds since the Unix epoch;
//! chrono is used only at the boundaries (CLI input, display, created_at).

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local creation timestamp in ISO 8601, as stored in created_at columns.
pub fn created_at_now() -> String {
    Local::now().to_rfc3339()
}

/// Format a duration in milliseconds as HH:MM:SS (sign preserved).
pub fn format_duration_ms(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let secs = ms.abs() / 1000;
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Render an epoch-ms instant in the local timezone, "YYYY-MM-DD HH:MM".
pub fn format_ms_local(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("@{}ms", ms),
    }
}

/// Parse "YYYY-MM-DD" or "YYYY-MM-DD HH:MM" (local time) into epoch ms.
pub fn parse_local_ms(input: &str) -> AppResult<i64> {
    let naive = if input.len() <= 10 {
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|_| AppError::InvalidTimestamp(input.to_string()))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::InvalidTimestamp(input.to_string()))?
    } else {
        NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
            .map_err(|_| AppError::InvalidTimestamp(input.to_string()))?
    };

    let dt: DateTime<Local> = naive
        .and_local_timezone(Local)
        .single()
        .ok_or_else(|| AppError::InvalidTimestamp(input.to_string()))?;

    Ok(dt.timestamp_millis())
}
