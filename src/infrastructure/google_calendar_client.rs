use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::GoogleCalendarEvent;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const PRIMARY_CALENDAR_ID: &str = "primary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEventsRequest {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

/// Read-only source of external events for a time window.
#[async_trait]
pub trait CalendarEventSource: Send + Sync {
    async fn list_events(
        &self,
        access_token: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_base: String,
    calendar_id: String,
}

impl Default for ReqwestGoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_base: CALENDAR_API_BASE.to_string(),
            calendar_id: PRIMARY_CALENDAR_ID.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Feed(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn feed_http_error(status: StatusCode, body: &str) -> InfraError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return InfraError::Unauthorized;
        }
        let reason = status.canonical_reason().unwrap_or("unknown status");
        if body.trim().is_empty() {
            InfraError::Feed(format!("failed to fetch calendar: http {} {reason}", status.as_u16()))
        } else {
            InfraError::Feed(format!(
                "failed to fetch calendar: http {} {reason}; body={body}",
                status.as_u16()
            ))
        }
    }

    fn events_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|error| InfraError::Feed(format!("invalid calendar api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Feed("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(&self.calendar_id);
            segments.push("events");
        }
        Ok(url)
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[async_trait]
impl CalendarEventSource for ReqwestGoogleCalendarClient {
    async fn list_events(
        &self,
        access_token: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.events_endpoint()?;
        let time_min = request.time_min.to_rfc3339_opts(SecondsFormat::Millis, true);
        let time_max = request.time_max.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut page_token: Option<String> = None;
        let mut events = Vec::new();

        loop {
            let mut req = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                ]);
            if let Some(page_token) = page_token.as_deref() {
                req = req.query(&[("pageToken", page_token)]);
            }

            let response = req.send().await.map_err(|error| {
                InfraError::Feed(format!("network error while listing calendar events: {error}"))
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| {
                InfraError::Feed(format!("failed reading events list response: {error}"))
            })?;

            if !status.is_success() {
                return Err(Self::feed_http_error(status, &body));
            }

            let mut parsed: EventsPageResponse = serde_json::from_str(&body).map_err(|error| {
                InfraError::Feed(format!("invalid events list payload: {error}; body={body}"))
            })?;

            events.extend(parsed.items.take().unwrap_or_default());
            match parsed.next_page_token.take() {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_endpoint_targets_primary_calendar() {
        let client = ReqwestGoogleCalendarClient::new();
        let url = client.events_endpoint().expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
    }

    #[test]
    fn events_endpoint_escapes_calendar_ids() {
        let client = ReqwestGoogleCalendarClient::new().with_calendar_id("team@example.com#x");
        let url = client.events_endpoint().expect("endpoint");
        assert!(url.as_str().ends_with("/calendars/team@example.com%23x/events"));
    }

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        assert!(matches!(
            ReqwestGoogleCalendarClient::feed_http_error(StatusCode::UNAUTHORIZED, ""),
            InfraError::Unauthorized
        ));
        assert!(matches!(
            ReqwestGoogleCalendarClient::feed_http_error(StatusCode::FORBIDDEN, "denied"),
            InfraError::Unauthorized
        ));
        let InfraError::Feed(message) =
            ReqwestGoogleCalendarClient::feed_http_error(StatusCode::BAD_GATEWAY, "")
        else {
            panic!("expected feed error");
        };
        assert!(message.contains("502"));
    }

    #[tokio::test]
    async fn list_events_rejects_empty_token_before_any_request() {
        let client = ReqwestGoogleCalendarClient::new().with_api_base("http://127.0.0.1:9/");
        let now = Utc::now();
        let result = client
            .list_events(
                "  ",
                ListEventsRequest {
                    time_min: now,
                    time_max: now,
                },
            )
            .await;
        assert!(matches!(result, Err(InfraError::Feed(message)) if message.contains("access token")));
    }
}
