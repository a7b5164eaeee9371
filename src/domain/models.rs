use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SLOT_DURATION: u32 = 30;
pub const DEFAULT_CALENDAR_DRAFT_TITLE: &str = "New slot";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Inbox,
    Todo,
    InProgress,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "inbox" => Some(Self::Inbox),
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    #[default]
    None,
    Low,
    High,
}

impl PriorityLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Red,
    Orange,
    Yellow,
    Green,
    Greenblue,
    Blue,
    Purple,
}

impl CategoryId {
    pub const ALL: [CategoryId; 7] = [
        CategoryId::Red,
        CategoryId::Orange,
        CategoryId::Yellow,
        CategoryId::Green,
        CategoryId::Greenblue,
        CategoryId::Blue,
        CategoryId::Purple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Greenblue => "greenblue",
            Self::Blue => "blue",
            Self::Purple => "purple",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
    }
}

/// One calendar placement of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTime {
    pub id: String,
    pub start: DateTime<Utc>,
    pub duration: u32,
}

impl ScheduledTime {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::minutes(i64::from(self.duration))
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "scheduled_time.id")?;
        if self.duration == 0 {
            return Err("scheduled_time.duration must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDraftSlot {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub duration: u32,
    pub category: Option<CategoryId>,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub importance: PriorityLevel,
    pub urgency: PriorityLevel,
}

impl CalendarDraftSlot {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "draft_slot.id")?;
        validate_non_empty(&self.title, "draft_slot.title")?;
        if self.duration == 0 {
            return Err("draft_slot.duration must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub category: Option<CategoryId>,
    pub importance: PriorityLevel,
    pub urgency: PriorityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub subtasks: Vec<Task>,
    pub scheduled_times: Vec<ScheduledTime>,
    pub is_collapsed: bool,
    pub is_done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Inbox,
            description: String::new(),
            due_date: None,
            category: None,
            importance: PriorityLevel::None,
            urgency: PriorityLevel::None,
            parent_id: None,
            subtasks: Vec::new(),
            scheduled_times: Vec::new(),
            is_collapsed: false,
            is_done: false,
            completed_at: None,
            is_archived: false,
        }
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// Done when marked done, or when every child is (recursively).
    pub fn is_effectively_done(&self) -> bool {
        if self.is_done {
            return true;
        }
        if self.subtasks.is_empty() {
            return false;
        }
        self.subtasks.iter().all(Task::is_effectively_done)
    }

    pub fn contains_descendant(&self, id: &str) -> bool {
        self.subtasks
            .iter()
            .any(|child| child.id == id || child.contains_descendant(id))
    }

    pub fn descendant_count(&self) -> usize {
        self.subtasks
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        if self.is_done && self.completed_at.is_none() {
            return Err("task.completed_at must be set when task.is_done".to_string());
        }
        if !self.is_done && self.completed_at.is_some() {
            return Err("task.completed_at must be empty when task is not done".to_string());
        }
        for slot in &self.scheduled_times {
            slot.validate()?;
        }
        for child in &self.subtasks {
            if child.parent_id.as_deref() != Some(self.id.as_str()) {
                return Err(format!(
                    "task.parent_id of {} must reference {}",
                    child.id, self.id
                ));
            }
            child.validate()?;
        }
        Ok(())
    }
}

pub type CategoryLabels = BTreeMap<CategoryId, String>;

pub fn default_category_labels() -> CategoryLabels {
    CategoryId::ALL
        .into_iter()
        .map(|id| (id, String::new()))
        .collect()
}

/// Everything the task store owns: the forest, the unattached draft slots and the category names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerState {
    pub tasks: Vec<Task>,
    pub calendar_draft_slots: Vec<CalendarDraftSlot>,
    pub category_labels: CategoryLabels,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            calendar_draft_slots: Vec::new(),
            category_labels: default_category_labels(),
        }
    }
}

/// Partial update merged by `TaskStore::update_task`. Nested options clear a field with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub category: Option<Option<CategoryId>>,
    pub importance: Option<PriorityLevel>,
    pub urgency: Option<PriorityLevel>,
    pub is_collapsed: Option<bool>,
    pub is_done: Option<bool>,
    pub is_archived: Option<bool>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn done(is_done: bool) -> Self {
        Self {
            is_done: Some(is_done),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSlotPatch {
    pub title: Option<String>,
    pub category: Option<Option<CategoryId>>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub importance: Option<PriorityLevel>,
    pub urgency: Option<PriorityLevel>,
}

/// Read-only event from the external calendar feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Task,
    Draft,
    External,
}

/// Uniform view of anything laid out in a calendar day column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSlot {
    pub id: String,
    pub task_id: String,
    pub slot_type: SlotType,
    pub title: String,
    pub category: Option<CategoryId>,
    pub start: DateTime<Utc>,
    pub duration: u32,
}

/// What a draggable element carries. Task cards carry the whole task, calendar blocks a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    Task(Task),
    CalendarSlot(CalendarSlot),
}

impl DragPayload {
    pub fn task(&self) -> Option<&Task> {
        match self {
            Self::Task(task) => Some(task),
            Self::CalendarSlot(_) => None,
        }
    }

    pub fn calendar_slot(&self) -> Option<&CalendarSlot> {
        match self {
            Self::Task(_) => None,
            Self::CalendarSlot(slot) => Some(slot),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Task(task) => &task.title,
            Self::CalendarSlot(slot) => &slot.title,
        }
    }

    pub fn is_draft_slot(&self) -> bool {
        matches!(self, Self::CalendarSlot(slot) if slot.slot_type == SlotType::Draft)
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
