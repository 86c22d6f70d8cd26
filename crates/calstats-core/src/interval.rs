//! Effective start/end of an event.
//!
//! Providers expose up to two start times for a recurring instance (the
//! declared start and the series' original start) and no duration field, so
//! the interval is reconstructed: the later of the two starts, plus the
//! declared end minus the declared start.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::event::{Event, EventTime};

/// The reconciled interval of a timed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveInterval {
    /// Effective start (inclusive).
    pub start: DateTime<Utc>,
    /// Effective end (exclusive).
    pub end: DateTime<Utc>,
    /// Declared end minus declared start.
    pub duration: Duration,
}

/// Resolves the effective interval of `event`.
///
/// Returns `Ok(None)` for all-day events: they never occupy a slot.
///
/// # Errors
///
/// Returns [`CoreError::MalformedEventTime`] when a timestamp is not valid
/// RFC 3339, when a timed start is paired with a date-only end, or when the
/// end precedes the start.
pub fn resolve_interval(event: &Event) -> CoreResult<Option<EffectiveInterval>> {
    if event.is_all_day() {
        return Ok(None);
    }

    let declared_start = parse_timed(event, "start", &event.start)?;
    let declared_end = parse_timed(event, "end", &event.end)?;

    let duration = declared_end - declared_start;
    if duration < Duration::zero() {
        return Err(malformed(
            event,
            "end",
            &event.end,
            "end precedes start".to_string(),
        ));
    }

    let start = match &event.original_start {
        Some(original @ EventTime::Timed(_)) => {
            declared_start.max(parse_timed(event, "original start", original)?)
        }
        // A date-only series start carries no time of day to reconcile.
        Some(EventTime::AllDay(_)) | None => declared_start,
    };

    Ok(Some(EffectiveInterval {
        start,
        end: start + duration,
        duration,
    }))
}

fn parse_timed(event: &Event, field: &'static str, time: &EventTime) -> CoreResult<DateTime<Utc>> {
    match time {
        EventTime::Timed(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| malformed(event, field, time, e.to_string())),
        EventTime::AllDay(_) => Err(malformed(
            event,
            field,
            time,
            "date-only value on a timed event".to_string(),
        )),
    }
}

fn malformed(event: &Event, field: &'static str, time: &EventTime, reason: String) -> CoreError {
    CoreError::MalformedEventTime {
        event_id: event.id.clone(),
        field,
        value: time.as_str().to_string(),
        reason,
    }
}
