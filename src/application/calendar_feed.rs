use crate::application::task_store::NowProvider;
use crate::domain::models::ExternalEvent;
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{GoogleCalendarEvent, to_external_events};
use crate::infrastructure::google_calendar_client::{CalendarEventSource, ListEventsRequest};
use crate::infrastructure::snapshot_codec::CalendarSettings;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{debug, info, warn};

pub const SESSION_EXPIRED_MESSAGE: &str = "Calendar session expired. Please reconnect.";
pub const ACCESS_REVOKED_MESSAGE: &str = "Session expired. Please reconnect.";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarFeedState {
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub events: Vec<ExternalEvent>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub is_loading: bool,
}

/// Read-only connection to an external calendar. Events are replaced wholesale on each fetch.
pub struct CalendarFeedService<C>
where
    C: CalendarEventSource,
{
    client: Arc<C>,
    state: CalendarFeedState,
    config: FeedConfig,
    timezone: Tz,
    retry_policy: RetryPolicy,
    now_provider: NowProvider,
}

impl<C> CalendarFeedService<C>
where
    C: CalendarEventSource,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            state: CalendarFeedState::default(),
            config: FeedConfig::default(),
            timezone: Tz::UTC,
            retry_policy: RetryPolicy::default(),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Restores a persisted connection. Expired tokens are not restored.
    pub fn with_settings(mut self, settings: CalendarSettings) -> Self {
        let now = (self.now_provider)();
        if let (Some(token), Some(expires_at)) = (settings.access_token, settings.token_expires_at) {
            if now < expires_at {
                self.state.access_token = Some(token);
                self.state.token_expires_at = Some(expires_at);
            }
        }
        self
    }

    pub fn state(&self) -> &CalendarFeedState {
        &self.state
    }

    pub fn events(&self) -> &[ExternalEvent] {
        &self.state.events
    }

    pub fn settings(&self) -> CalendarSettings {
        CalendarSettings {
            access_token: self.state.access_token.clone(),
            token_expires_at: self.state.token_expires_at,
        }
    }

    pub fn is_connected(&self) -> bool {
        let now = (self.now_provider)();
        self.state.access_token.is_some() && self.state.token_expires_at.is_some_and(|expires_at| now < expires_at)
    }

    /// Stores a freshly granted token valid for `expires_in_seconds`.
    pub fn connect(&mut self, access_token: impl Into<String>, expires_in_seconds: i64) {
        let now = (self.now_provider)();
        self.state.access_token = Some(access_token.into());
        self.state.token_expires_at = Some(now + Duration::seconds(expires_in_seconds.max(0)));
        self.state.error = None;
        info!("calendar feed connected");
    }

    pub fn disconnect(&mut self) {
        self.state.access_token = None;
        self.state.token_expires_at = None;
        self.state.events.clear();
        self.state.error = None;
        info!("calendar feed disconnected");
    }

    /// True when connected and the last fetch is older than the poll interval.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.state.last_fetched {
            None => true,
            Some(last_fetched) => now - last_fetched >= Duration::minutes(self.config.poll_minutes),
        }
    }

    /// From local midnight today to `window_days` after now.
    pub fn fetch_window(&self, now: DateTime<Utc>) -> ListEventsRequest {
        let today = now.with_timezone(&self.timezone).date_naive();
        let time_min = today
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.timezone.from_local_datetime(&midnight).earliest())
            .map_or(now, |start| start.with_timezone(&Utc));
        ListEventsRequest {
            time_min,
            time_max: now + Duration::days(self.config.window_days),
        }
    }

    /// Replaces the event list with the feed's current window. Returns the number of events kept.
    ///
    /// Without a token this does nothing. An expired or rejected token disconnects the feed.
    pub async fn fetch_events(&mut self) -> Result<usize, InfraError> {
        let Some(access_token) = self.state.access_token.clone() else {
            debug!("calendar feed not connected");
            return Ok(0);
        };
        let now = (self.now_provider)();
        if self.state.token_expires_at.is_none_or(|expires_at| now > expires_at) {
            self.state.access_token = None;
            self.state.token_expires_at = None;
            self.state.error = Some(SESSION_EXPIRED_MESSAGE.to_string());
            warn!("calendar token expired");
            return Err(InfraError::TokenExpired);
        }

        self.state.is_loading = true;
        self.state.error = None;
        let request = self.fetch_window(now);

        match self.list_events_with_retry(&access_token, request).await {
            Ok(raw_events) => {
                let events = to_external_events(&raw_events);
                let count = events.len();
                self.state.events = events;
                self.state.last_fetched = Some((self.now_provider)());
                self.state.is_loading = false;
                info!(count, "calendar events fetched");
                Ok(count)
            }
            Err(InfraError::Unauthorized) => {
                self.state.access_token = None;
                self.state.token_expires_at = None;
                self.state.error = Some(ACCESS_REVOKED_MESSAGE.to_string());
                self.state.is_loading = false;
                warn!("calendar feed rejected the token");
                Err(InfraError::Unauthorized)
            }
            Err(error) => {
                self.state.error = Some(error.to_string());
                self.state.is_loading = false;
                warn!(%error, "calendar fetch failed");
                Err(error)
            }
        }
    }

    async fn list_events_with_retry(
        &self,
        access_token: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.client.list_events(access_token, request.clone()).await {
                Ok(events) => return Ok(events),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    debug!(attempt, delay, "retrying calendar fetch");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    match error {
        InfraError::Feed(message) => {
            let message = message.to_ascii_lowercase();
            message.contains("network error")
                || message.contains("timeout")
                || message.contains("timed out")
                || message.contains("temporarily unavailable")
                || message.contains("connection reset")
        }
        _ => false,
    }
}
