//! Google Calendar API v3 REST calls.

use std::time::Duration;

use calstats_core::{Attendee, Creator, Event, EventTime, ResponseStatus, TimeWindow};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::{ProviderError, ProviderResult};
use crate::source::CalendarInfo;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Page size for `events.list`; the API maximum is 2500.
const PAGE_SIZE: u32 = 250;

#[derive(Debug, Clone)]
pub(super) struct GoogleCalendarClient {
    http_client: reqwest::Client,
}

impl GoogleCalendarClient {
    pub(super) fn new(timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calstats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;
        Ok(Self { http_client })
    }

    /// `calendars.get`
    pub(super) async fn get_calendar(
        &self,
        access_token: &str,
        calendar_id: &str,
    ) -> ProviderResult<CalendarInfo> {
        let url = format!(
            "{}/calendars/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        let calendar: ApiCalendar = self.get_json(access_token, &url, &[]).await?;
        Ok(CalendarInfo {
            id: calendar.id,
            summary: calendar.summary.unwrap_or_default(),
            timezone: calendar.time_zone,
        })
    }

    /// `events.list` with recurring events expanded, following every page.
    pub(super) async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<Event>> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut query = vec![
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("showDeleted", "false".to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: EventListResponse = self.get_json(access_token, &url, &query).await?;
            pages += 1;

            for item in page.items {
                if let Some(event) = convert_event(item)? {
                    events.push(event);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar = calendar_id,
            count = events.len(),
            pages,
            "fetched events"
        );
        Ok(events)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, retry_after.as_deref()));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

/// Maps a non-success HTTP status to an error.
fn status_error(status: StatusCode, body: &str, retry_after: Option<&str>) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::authentication(
            "access token rejected; run 'calstats auth google --force'",
        ),
        StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("access denied: {}", api_message(body)))
        }
        StatusCode::NOT_FOUND => ProviderError::not_found("calendar not found"),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(match retry_after {
            Some(secs) => format!("rate limit exceeded, retry after {} seconds", secs),
            None => "rate limit exceeded".to_string(),
        }),
        StatusCode::BAD_REQUEST => ProviderError::bad_request(api_message(body)),
        s if s.is_server_error() => {
            ProviderError::server(format!("API error ({}): {}", s, api_message(body)))
        }
        s => ProviderError::invalid_response(format!("unexpected status {}: {}", s, api_message(body))),
    }
}

/// Extracts `error.message` from a Google error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Converts an API event. Cancelled instances yield `None`.
fn convert_event(item: ApiEvent) -> ProviderResult<Option<Event>> {
    if item.status.as_deref() == Some("cancelled") {
        trace!(event_id = ?item.id, "skipping cancelled event");
        return Ok(None);
    }

    let id = item.id.unwrap_or_default();
    let start = item.start.and_then(ApiEventTime::into_event_time).ok_or_else(|| {
        ProviderError::invalid_response(format!("event '{}' has no start time", id))
    })?;
    let end = item.end.and_then(ApiEventTime::into_event_time).ok_or_else(|| {
        ProviderError::invalid_response(format!("event '{}' has no end time", id))
    })?;

    let mut event = Event::new(id, item.summary.unwrap_or_default(), start, end)
        .with_description(item.description.unwrap_or_default());
    event.original_start = item
        .original_start_time
        .and_then(ApiEventTime::into_event_time);
    event.creator = item.creator.map(|c| Creator {
        email: c.email,
        is_self: c.is_self,
    });
    event.attendees = item
        .attendees
        .into_iter()
        .map(|a| Attendee {
            email: a.email.unwrap_or_default(),
            response_status: a.response_status.as_deref().map(ResponseStatus::from_provider),
            is_self: a.is_self,
        })
        .collect();

    Ok(Some(event))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    summary: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    original_start_time: Option<ApiEventTime>,
    creator: Option<ApiCreator>,
    #[serde(default)]
    attendees: Vec<ApiAttendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl ApiEventTime {
    fn into_event_time(self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(date_time), _) => Some(EventTime::Timed(date_time)),
            (None, Some(date)) => Some(EventTime::AllDay(date)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiCreator {
    email: Option<String>,
    #[serde(rename = "self", default)]
    is_self: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    response_status: Option<String>,
    #[serde(rename = "self", default)]
    is_self: bool,
}
