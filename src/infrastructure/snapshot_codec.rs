use crate::domain::models::{
    CalendarDraftSlot, CategoryId, CategoryLabels, DEFAULT_CALENDAR_DRAFT_TITLE, DEFAULT_SLOT_DURATION,
    PlannerState, PriorityLevel, ScheduledTime, Task, TaskStatus, default_category_labels,
};
use crate::domain::time_grid::MAX_BLOCK_MINUTES;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Persisted connection settings for the external calendar feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarSettings {
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

pub fn encode_task_document(state: &PlannerState) -> Result<String, InfraError> {
    Ok(serde_json::to_string(state)?)
}

/// Decodes a persisted task document, repairing every field that does not fit the current shape.
/// Unparseable JSON yields an empty state.
pub fn decode_task_document(raw: &str, now: DateTime<Utc>) -> PlannerState {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "failed to parse stored task document");
            return PlannerState::default();
        }
    };
    if !parsed.is_object() {
        return PlannerState::default();
    }

    let mut seen_ids = HashSet::new();
    let tasks = parsed
        .get("tasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| normalize_task(item, None, now, &mut seen_ids))
                .collect()
        })
        .unwrap_or_default();

    let calendar_draft_slots = parsed
        .get("calendarDraftSlots")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_draft_slot).collect())
        .unwrap_or_default();

    PlannerState {
        tasks,
        calendar_draft_slots,
        category_labels: normalize_category_labels(parsed.get("categoryLabels")),
    }
}

pub fn encode_calendar_settings(settings: &CalendarSettings) -> Result<String, InfraError> {
    let value = serde_json::json!({
        "accessToken": settings.access_token,
        "tokenExpiresAt": settings
            .token_expires_at
            .map(|value| value.timestamp_millis())
            .unwrap_or(0),
    });
    Ok(serde_json::to_string(&value)?)
}

/// Restores the token only while it is still valid at `now`.
pub fn decode_calendar_settings(raw: &str, now: DateTime<Utc>) -> CalendarSettings {
    let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
        return CalendarSettings::default();
    };
    let token = parsed
        .get("accessToken")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty());
    let expires_at = parsed
        .get("tokenExpiresAt")
        .and_then(Value::as_i64)
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single());

    match (token, expires_at) {
        (Some(token), Some(expires_at)) if now < expires_at => CalendarSettings {
            access_token: Some(token.to_string()),
            token_expires_at: Some(expires_at),
        },
        _ => CalendarSettings::default(),
    }
}

fn coerce_status(value: Option<&Value>) -> TaskStatus {
    match value.and_then(Value::as_str) {
        Some("scheduled") => TaskStatus::Todo,
        Some("done") => TaskStatus::InProgress,
        Some(other) => TaskStatus::parse(other).unwrap_or(TaskStatus::Inbox),
        None => TaskStatus::Inbox,
    }
}

fn normalize_priority(value: Option<&Value>) -> PriorityLevel {
    match value.and_then(Value::as_str) {
        Some("medium") => PriorityLevel::Low,
        Some(other) => PriorityLevel::parse(other).unwrap_or(PriorityLevel::None),
        None => PriorityLevel::None,
    }
}

fn normalize_category(value: Option<&Value>) -> Option<CategoryId> {
    value.and_then(Value::as_str).and_then(CategoryId::parse)
}

fn normalize_due_date(value: Option<&Value>) -> Option<NaiveDate> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok())
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn id_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(new_id)
}

fn bool_field(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Accepts RFC 3339 strings and epoch milliseconds.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok(),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn slot_start(slot: &Value) -> Option<DateTime<Utc>> {
    ["start", "scheduledTime", "time"]
        .into_iter()
        .find_map(|key| slot.get(key).filter(|value| !value.is_null()))
        .and_then(parse_instant)
}

fn slot_duration(slot: &Value) -> u32 {
    let raw = slot
        .get("duration")
        .and_then(Value::as_f64)
        .or_else(|| slot.get("estimatedDuration").and_then(Value::as_f64))
        .unwrap_or(f64::from(DEFAULT_SLOT_DURATION));
    if raw.is_finite() && raw >= 1.0 {
        raw.round().min(f64::from(MAX_BLOCK_MINUTES)) as u32
    } else {
        DEFAULT_SLOT_DURATION
    }
}

fn normalize_slot(slot: &Value) -> Option<ScheduledTime> {
    let start = slot_start(slot)?;
    Some(ScheduledTime {
        id: id_field(slot.get("id")),
        start,
        duration: slot_duration(slot),
    })
}

fn normalize_draft_slot(slot: &Value) -> Option<CalendarDraftSlot> {
    let start = slot_start(slot)?;
    let title = slot
        .get("title")
        .and_then(Value::as_str)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(DEFAULT_CALENDAR_DRAFT_TITLE)
        .to_string();
    Some(CalendarDraftSlot {
        id: id_field(slot.get("id")),
        title,
        start,
        duration: slot_duration(slot),
        category: normalize_category(slot.get("category")),
        description: string_field(slot.get("description")),
        due_date: normalize_due_date(slot.get("dueDate")),
        importance: normalize_priority(slot.get("importance")),
        urgency: normalize_priority(slot.get("urgency")),
    })
}

fn normalize_task(
    task: &Value,
    parent_id: Option<&str>,
    now: DateTime<Utc>,
    seen_ids: &mut HashSet<String>,
) -> Task {
    let mut id = id_field(task.get("id"));
    if !seen_ids.insert(id.clone()) {
        id = new_id();
        seen_ids.insert(id.clone());
    }

    let subtasks: Vec<Task> = task
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| normalize_task(item, Some(id.as_str()), now, seen_ids))
                .collect()
        })
        .unwrap_or_default();

    let scheduled_times = match task.get("scheduledTimes").and_then(Value::as_array) {
        Some(items) => items.iter().filter_map(normalize_slot).collect(),
        None => task
            .get("scheduledTime")
            .filter(|value| !value.is_null())
            .and_then(|start| {
                let mut legacy = serde_json::Map::new();
                legacy.insert("start".to_string(), start.clone());
                if let Some(duration) = task.get("estimatedDuration") {
                    legacy.insert("duration".to_string(), duration.clone());
                }
                normalize_slot(&Value::Object(legacy))
            })
            .into_iter()
            .collect(),
    };

    let was_done_status = task.get("status").and_then(Value::as_str) == Some("done");
    let is_done = (was_done_status && subtasks.is_empty()) || bool_field(task.get("isDone"));
    let completed_at = if is_done {
        Some(
            task.get("completedAt")
                .and_then(parse_instant)
                .unwrap_or(now),
        )
    } else {
        None
    };

    Task {
        title: string_field(task.get("title")),
        status: coerce_status(task.get("status")),
        description: string_field(task.get("description")),
        due_date: normalize_due_date(task.get("dueDate")),
        category: normalize_category(task.get("category")),
        importance: normalize_priority(task.get("importance")),
        urgency: normalize_priority(task.get("urgency")),
        parent_id: parent_id.map(ToOwned::to_owned),
        subtasks,
        scheduled_times,
        is_collapsed: bool_field(task.get("isCollapsed")),
        is_done,
        completed_at,
        is_archived: bool_field(task.get("isArchived")),
        id,
    }
}

fn normalize_category_labels(value: Option<&Value>) -> CategoryLabels {
    let mut labels = default_category_labels();
    let Some(stored) = value.and_then(Value::as_object) else {
        return labels;
    };
    for id in CategoryId::ALL {
        if let Some(label) = stored.get(id.as_str()).and_then(Value::as_str) {
            labels.insert(id, label.to_string());
        }
    }
    labels
}
