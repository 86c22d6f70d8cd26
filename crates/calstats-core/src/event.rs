//! Calendar event types consumed by the analysis.
//!
//! This module provides:
//! - [`Event`]: a single concrete event instance as returned by a data source
//! - [`EventTime`]: a timed or all-day timestamp, kept in the provider's text form
//! - [`Attendee`] and [`Creator`]: the identities attached to an event
//! - [`ResponseStatus`]: an attendee's reply to the invitation
//!
//! Timestamps stay unparsed here; [`crate::interval::resolve_interval`] owns
//! parsing so that malformed provider data surfaces as a single error kind.

use serde::{Deserialize, Serialize};

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
}

impl ResponseStatus {
    /// Parses a provider response string.
    ///
    /// Unrecognised values are treated as [`ResponseStatus::NeedsAction`]:
    /// the reply is present but is not an acceptance.
    pub fn from_provider(value: &str) -> Self {
        match value {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "tentative" => Self::Tentative,
            _ => Self::NeedsAction,
        }
    }
}

/// The start or end of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EventTime {
    /// An RFC 3339 date-time, e.g. `2025-02-05T09:00:00+01:00`.
    Timed(String),
    /// A date without time of day, e.g. `2025-02-05`.
    AllDay(String),
}

impl EventTime {
    /// Creates a timed value from RFC 3339 text.
    pub fn timed(value: impl Into<String>) -> Self {
        Self::Timed(value.into())
    }

    /// Creates an all-day value from a `YYYY-MM-DD` date.
    pub fn all_day(value: impl Into<String>) -> Self {
        Self::AllDay(value.into())
    }

    /// Returns `true` if this value carries no time of day.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the raw provider text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Timed(value) | Self::AllDay(value) => value,
        }
    }
}

/// The account that created an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// The creator's email address, if the provider exposes it.
    pub email: Option<String>,
    /// Whether the creator is the owner of the calendar being read.
    #[serde(default)]
    pub is_self: bool,
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,
    /// The attendee's reply, `None` when the provider sent none.
    pub response_status: Option<ResponseStatus>,
    /// Whether this attendee entry represents the calendar owner.
    #[serde(default)]
    pub is_self: bool,
}

impl Attendee {
    /// Creates an attendee with no recorded response.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            response_status: None,
            is_self: false,
        }
    }

    /// Builder method to set the response status.
    pub fn with_response(mut self, status: ResponseStatus) -> Self {
        self.response_status = Some(status);
        self
    }
}

/// A concrete calendar event instance.
///
/// Recurring series arrive already expanded; an instance that was moved from
/// its series slot carries `original_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Provider identifier, used in error messages.
    pub id: String,
    /// The event title/summary.
    pub title: String,
    /// The event description (may contain HTML).
    #[serde(default)]
    pub description: String,
    /// Declared start.
    pub start: EventTime,
    /// Declared end.
    pub end: EventTime,
    /// Series start of a recurring instance.
    #[serde(default)]
    pub original_start: Option<EventTime>,
    /// Who created the event.
    #[serde(default)]
    pub creator: Option<Creator>,
    /// Invited attendees, in provider order.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl Event {
    /// Creates an event with no description, creator or attendees.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            start,
            end,
            original_start: None,
            creator: None,
            attendees: Vec::new(),
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns true if the calendar owner created this event.
    pub fn created_by_self(&self) -> bool {
        self.creator.as_ref().is_some_and(|c| c.is_self)
    }

    /// Returns the attendee records whose email is `email`.
    pub fn attendee_records<'a>(&'a self, email: &'a str) -> impl Iterator<Item = &'a Attendee> {
        self.attendees.iter().filter(move |a| a.email == email)
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the original start of a recurring instance.
    pub fn with_original_start(mut self, original_start: EventTime) -> Self {
        self.original_start = Some(original_start);
        self
    }

    /// Builder method to set the creator.
    pub fn with_creator(mut self, email: impl Into<String>, is_self: bool) -> Self {
        self.creator = Some(Creator {
            email: Some(email.into()),
            is_self,
        });
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event::new(
            "evt-123",
            "Team Standup",
            EventTime::timed("2025-02-05T10:00:00Z"),
            EventTime::timed("2025-02-05T10:30:00Z"),
        )
    }

    #[test]
    fn response_status_from_provider() {
        assert_eq!(ResponseStatus::from_provider("accepted"), ResponseStatus::Accepted);
        assert_eq!(ResponseStatus::from_provider("declined"), ResponseStatus::Declined);
        assert_eq!(ResponseStatus::from_provider("tentative"), ResponseStatus::Tentative);
        assert_eq!(ResponseStatus::from_provider("needsAction"), ResponseStatus::NeedsAction);
        assert_eq!(ResponseStatus::from_provider("maybe"), ResponseStatus::NeedsAction);
    }

    #[test]
    fn all_day_detection() {
        assert!(!sample_event().is_all_day());

        let event = Event::new(
            "evt-456",
            "Offsite",
            EventTime::all_day("2025-02-05"),
            EventTime::all_day("2025-02-06"),
        );
        assert!(event.is_all_day());
        assert_eq!(event.start.as_str(), "2025-02-05");
    }

    #[test]
    fn creator_self_flag() {
        assert!(!sample_event().created_by_self());
        assert!(sample_event().with_creator("a@x.com", true).created_by_self());
        assert!(!sample_event().with_creator("b@x.com", false).created_by_self());
    }

    #[test]
    fn attendee_records_filter_by_email() {
        let event = sample_event()
            .with_attendee(Attendee::new("a@x.com").with_response(ResponseStatus::Accepted))
            .with_attendee(Attendee::new("b@x.com"));

        let mine: Vec<_> = event.attendee_records("a@x.com").collect();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].response_status, Some(ResponseStatus::Accepted));
        assert_eq!(event.attendee_records("c@x.com").count(), 0);
    }

    #[test]
    fn deserialize_fixture() {
        let json = r#"{
            "id": "evt-1",
            "title": "Sync",
            "start": {"type": "timed", "value": "2025-02-05T09:00:00Z"},
            "end": {"type": "timed", "value": "2025-02-05T09:30:00Z"},
            "attendees": [
                {"email": "a@x.com", "response_status": "needsAction"}
            ]
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.title, "Sync");
        assert!(event.description.is_empty());
        assert_eq!(
            event.attendees[0].response_status,
            Some(ResponseStatus::NeedsAction)
        );
    }
}
