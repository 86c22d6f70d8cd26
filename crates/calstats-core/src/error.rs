//! Error types for the analysis core.
//!
//! Every variant is fatal for the calendar being processed: a bad timestamp
//! or timezone aborts the run instead of being skipped.

use thiserror::Error;

/// Errors raised while generating slots or resolving event times.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The calendar's timezone is not a known IANA identifier.
    #[error("invalid timezone '{timezone}'")]
    InvalidTimezone { timezone: String },

    /// The window start could not be parsed as a civil date-time.
    #[error("invalid start time '{input}' (expected YYYY/MM/DD HH:MM:SS): {source}")]
    InvalidStartTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A day's wall-clock start does not exist in the timezone (DST gap).
    #[error("local time {local} does not exist in {timezone}")]
    NonexistentLocalTime { local: String, timezone: String },

    /// The analysis window is longer than the supported maximum.
    #[error("analysis window of {requested} is too large (at most {max_days} days)")]
    WindowTooLarge { requested: String, max_days: u32 },

    /// An event timestamp could not be interpreted.
    #[error("event '{event_id}' has malformed {field} '{value}': {reason}")]
    MalformedEventTime {
        event_id: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// An ignore pattern failed to compile.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_event_time_display() {
        let err = CoreError::MalformedEventTime {
            event_id: "evt-1".to_string(),
            field: "start",
            value: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("evt-1"));
        assert!(display.contains("start"));
        assert!(display.contains("yesterday"));
    }

    #[test]
    fn invalid_start_time_keeps_source() {
        use std::error::Error;
        let parse_err = chrono::NaiveDateTime::parse_from_str("nope", "%Y/%m/%d %H:%M:%S")
            .unwrap_err();
        let err = CoreError::InvalidStartTime {
            input: "nope".to_string(),
            source: parse_err,
        };
        assert!(err.source().is_some());
    }
}
