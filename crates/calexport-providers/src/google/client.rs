//! Google Calendar and userinfo HTTP calls.

use std::time::Duration;

use calexport_core::{EventTime, RawAttendee, RawEvent, ResponseStatus, TimeWindow};
use chrono::{DateTime, NaiveDate, SecondsFormat};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Thin client over the two Google endpoints an export needs.
#[derive(Debug, Clone)]
pub struct GoogleApiClient {
    http_client: reqwest::Client,
}

impl GoogleApiClient {
    pub fn new(timeout: Duration, user_agent: &str) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;
        Ok(Self { http_client })
    }

    /// Lists the occurrences in `window` with one `events.list` call.
    ///
    /// Recurring events are expanded server side and results come back
    /// ordered by start time. Only the first page is read.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<RawEvent>> {
        let url = format!(
            "{CALENDAR_API_BASE}/calendars/{}/events",
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", window.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let body = read_success_body(response).await?;
        let list: EventListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("failed to parse events response").with_source(e)
        })?;

        if list.next_page_token.is_some() {
            debug!("events response has more pages, only the first one is used");
        }

        let events = list
            .items
            .into_iter()
            .map(convert_event)
            .collect::<ProviderResult<Vec<_>>>()?;
        debug!(count = events.len(), calendar_id, "fetched events");
        Ok(events)
    }

    /// Returns the address of the account the token belongs to.
    pub async fn user_email(&self, access_token: &str) -> ProviderResult<String> {
        let response = self
            .http_client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        let body = read_success_body(response).await?;
        let info: UserInfo = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("failed to parse userinfo response").with_source(e)
        })?;

        info.email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ProviderError::authentication("userinfo response has no email address"))
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ProviderError::network(message).with_source(e)
}

/// Maps error statuses and returns the body of a successful response.
async fn read_success_body(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {s} seconds"))
                .unwrap_or_default()
        )));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ProviderError::authentication("access token expired or invalid"));
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::authorization("access denied"));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::server(format!("API error ({status}): {body}")));
    }

    response
        .text()
        .await
        .map_err(|e| ProviderError::network("failed to read response").with_source(e))
}

fn convert_time(time: Option<ApiEventTime>, event_id: &str, field: &str) -> ProviderResult<EventTime> {
    let time = time.unwrap_or_default();
    match (time.date_time, time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(&dt)
            .map(EventTime::DateTime)
            .map_err(|e| {
                ProviderError::invalid_response(format!("event {event_id}: bad {field}.dateTime '{dt}'"))
                    .with_source(e)
            }),
        (None, Some(date)) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map(EventTime::Date)
            .map_err(|e| {
                ProviderError::invalid_response(format!("event {event_id}: bad {field}.date '{date}'"))
                    .with_source(e)
            }),
        (None, None) => Err(ProviderError::missing_field(format!(
            "event {event_id} has no {field}"
        ))),
    }
}

/// Converts one API record. Attendees without an address are kept so the
/// attendee count stays what the server reported.
fn convert_event(event: ApiEvent) -> ProviderResult<RawEvent> {
    let id = event.id.unwrap_or_default();
    let start = convert_time(event.start, &id, "start")?;
    let end = convert_time(event.end, &id, "end")?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .map(|a| RawAttendee {
            email: a.email.unwrap_or_default(),
            response_status: a
                .response_status
                .as_deref()
                .map_or(ResponseStatus::Unknown, ResponseStatus::parse),
        })
        .collect();

    let mut raw = RawEvent::new(id, start, end)
        .with_guests_visible(event.guests_can_see_other_guests.unwrap_or(true));
    raw.summary = event.summary;
    raw.attendees = attendees;
    Ok(raw)
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
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    attendees: Option<Vec<ApiAttendee>>,
    guests_can_see_other_guests: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}
