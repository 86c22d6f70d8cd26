//! The `CalendarSource` abstraction and an in-memory implementation.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use calstats_core::{Event, EventTime, TimeWindow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// A boxed future, so that [`CalendarSource`] stays object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Metadata for one calendar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarInfo {
    /// The calendar identifier, usually the owner's email address.
    pub id: String,
    #[serde(default)]
    pub summary: String,
    /// IANA timezone of the calendar owner.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CalendarInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: String::new(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Where calendars and their events come from.
///
/// Implementations return concrete event instances: recurring series are
/// expanded, deleted entries are left out, and results are ordered by start.
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Looks up a calendar by identifier.
    fn calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>>;

    /// Lists the events of calendar `id` that overlap `window`.
    fn list_events<'a>(
        &'a self,
        id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>>;
}

#[derive(Debug, Clone, Deserialize)]
struct MemoryCalendar {
    #[serde(flatten)]
    info: CalendarInfo,
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct MemoryFile {
    calendars: Vec<MemoryCalendar>,
}

/// Calendars held in memory, e.g. loaded from a JSON export.
///
/// Events are filtered and ordered the way a remote calendar API would:
/// only events overlapping the window, sorted by declared start. Events
/// whose times do not parse are passed through untouched so that the
/// analysis reports them.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    calendars: BTreeMap<String, MemoryCalendar>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a calendar and its events.
    pub fn with_calendar(mut self, info: CalendarInfo, events: Vec<Event>) -> Self {
        self.calendars
            .insert(info.id.clone(), MemoryCalendar { info, events });
        self
    }

    /// Parses `{"calendars": [{"id", "summary", "timezone", "events": [...]}]}`.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: MemoryFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse calendar file: {}", e))
                .with_source(e)
        })?;

        Ok(file
            .calendars
            .into_iter()
            .fold(Self::new(), |source, cal| source.with_calendar(cal.info, cal.events)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read calendar file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    fn get(&self, id: &str) -> ProviderResult<&MemoryCalendar> {
        self.calendars.get(id).ok_or_else(|| {
            ProviderError::not_found(format!("calendar '{}' not found", id)).with_provider("memory")
        })
    }
}

impl CalendarSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move { self.get(id).map(|cal| cal.info.clone()) })
    }

    fn list_events<'a>(
        &'a self,
        id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(async move {
            let cal = self.get(id)?;
            let mut events: Vec<Event> = cal
                .events
                .iter()
                .filter(|e| {
                    declared_bounds(e).is_none_or(|(start, end)| window.overlaps(start, end))
                })
                .cloned()
                .collect();
            events.sort_by_key(|e| declared_bounds(e).map(|(start, _)| start));
            debug!(calendar = id, count = events.len(), "listed in-memory events");
            Ok(events)
        })
    }
}

fn declared_bounds(event: &Event) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((instant(&event.start)?, instant(&event.end)?))
}

fn instant(time: &EventTime) -> Option<DateTime<Utc>> {
    match time {
        EventTime::Timed(value) => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        EventTime::AllDay(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, d, h, 0, 0).unwrap()
    }

    fn timed(id: &str, start: &str, end: &str) -> Event {
        Event::new(id, id, EventTime::timed(start), EventTime::timed(end))
    }

    fn source() -> MemorySource {
        MemorySource::new().with_calendar(
            CalendarInfo::new("me@x.com").with_timezone("Europe/London"),
            vec![
                timed("late", "2025-02-05T15:00:00Z", "2025-02-05T16:00:00Z"),
                timed("early", "2025-02-05T09:00:00Z", "2025-02-05T10:00:00Z"),
                timed("outside", "2025-02-12T09:00:00Z", "2025-02-12T10:00:00Z"),
                Event::new(
                    "holiday",
                    "holiday",
                    EventTime::all_day("2025-02-04"),
                    EventTime::all_day("2025-02-05"),
                ),
            ],
        )
    }

    #[tokio::test]
    async fn calendar_lookup() {
        let source = source();
        let info = source.calendar("me@x.com").await.unwrap();
        assert_eq!(info.timezone.as_deref(), Some("Europe/London"));

        let err = source.calendar("nobody@x.com").await.unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn events_are_filtered_and_sorted() {
        let window = TimeWindow::new(utc(3, 7), utc(10, 7));
        let events = source().list_events("me@x.com", &window).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["holiday", "early", "late"]);
    }

    #[tokio::test]
    async fn unparseable_events_are_kept() {
        let source = MemorySource::new().with_calendar(
            CalendarInfo::new("me@x.com"),
            vec![timed("bad", "soon", "later")],
        );
        let window = TimeWindow::new(utc(3, 7), utc(10, 7));
        let events = source.list_events("me@x.com", &window).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn from_json() {
        let json = r#"{
            "calendars": [{
                "id": "me@x.com",
                "timezone": "America/New_York",
                "events": [{
                    "id": "evt-1",
                    "title": "Sync",
                    "start": {"type": "timed", "value": "2025-02-05T09:00:00Z"},
                    "end": {"type": "timed", "value": "2025-02-05T09:30:00Z"}
                }]
            }]
        }"#;
        let source = MemorySource::from_json(json).unwrap();
        let cal = source.get("me@x.com").unwrap();
        assert_eq!(cal.info.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(cal.events.len(), 1);
    }

    #[test]
    fn from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MemorySource::from_file(dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
    }
}
