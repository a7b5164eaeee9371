use crate::domain::models::ExternalEvent;
use chrono::{DateTime, NaiveDate, Utc};

const DEFAULT_EVENT_TITLE: &str = "Busy";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
}

/// Maps a feed item onto an `ExternalEvent`. Items without an id, a parseable start/end, or that
/// were cancelled are skipped. All-day dates are taken as UTC midnight.
pub fn to_external_event(event: &GoogleCalendarEvent) -> Option<ExternalEvent> {
    let id = event
        .id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let is_cancelled = event
        .status
        .as_deref()
        .map(|status| status.eq_ignore_ascii_case("cancelled"))
        .unwrap_or(false);
    if is_cancelled {
        return None;
    }

    let start = parse_event_time(&event.start)?;
    let end = parse_event_time(&event.end)?;
    let duration = (end - start).num_minutes().clamp(0, i64::from(u32::MAX)) as u32;
    let title = event
        .summary
        .as_deref()
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_EVENT_TITLE)
        .to_string();

    Some(ExternalEvent {
        id: id.to_string(),
        title,
        start,
        end,
        duration,
    })
}

pub fn to_external_events(events: &[GoogleCalendarEvent]) -> Vec<ExternalEvent> {
    events.iter().filter_map(to_external_event).collect()
}

fn parse_event_time(value: &CalendarEventDateTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = value.date_time.as_deref() {
        return DateTime::parse_from_rfc3339(date_time)
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok();
    }
    let date = value.date.as_deref()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}
