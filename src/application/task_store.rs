use crate::domain::models::{
    CalendarDraftSlot, CalendarSlot, CategoryId, DEFAULT_CALENDAR_DRAFT_TITLE, DEFAULT_SLOT_DURATION,
    DraftSlotPatch, ExternalEvent, PlannerState, ScheduledTime, SlotType, Task, TaskPatch, TaskStatus,
};
use crate::domain::schedule::{ScheduleItem, resolve_schedule};
use crate::domain::time_grid::{DAY_MINUTES, MAX_BLOCK_MINUTES, instant_at_minutes, local_date, minutes_in_day};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
type Observer = Box<dyn Fn(&PlannerState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A task together with the sequence that owns it.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub siblings: &'a [Task],
    pub index: usize,
}

impl<'a> TaskContext<'a> {
    pub fn task(&self) -> &'a Task {
        &self.siblings[self.index]
    }
}

#[derive(Clone, Copy)]
struct MutationEnv {
    timezone: Tz,
    now: DateTime<Utc>,
    default_slot_duration: u32,
}

/// Owner of the task forest and the draft slot collection.
///
/// Every change goes through one commit that notifies subscribers once. Operations that name an
/// unknown id change nothing and notify nobody.
pub struct TaskStore {
    state: PlannerState,
    timezone: Tz,
    default_slot_duration: u32,
    now_provider: NowProvider,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl TaskStore {
    pub fn new(state: PlannerState) -> Self {
        Self {
            state,
            timezone: Tz::UTC,
            default_slot_duration: DEFAULT_SLOT_DURATION,
            now_provider: Arc::new(Utc::now),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_default_slot_duration(mut self, duration: u32) -> Self {
        if duration > 0 {
            self.default_slot_duration = duration.min(MAX_BLOCK_MINUTES);
        }
        self
    }

    /// Length given to blocks created without an explicit duration.
    pub fn default_slot_duration(&self) -> u32 {
        self.default_slot_duration
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn subscribe(&mut self, observer: impl Fn(&PlannerState) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(candidate, _)| *candidate != id);
    }

    /// Applies `change` to the state and notifies subscribers once.
    pub fn mutate<R>(&mut self, change: impl FnOnce(&mut PlannerState) -> R) -> R {
        let result = change(&mut self.state);
        self.notify();
        result
    }

    fn commit(&mut self, change: impl FnOnce(&mut PlannerState, MutationEnv) -> bool) -> bool {
        let env = MutationEnv {
            timezone: self.timezone,
            now: (self.now_provider)(),
            default_slot_duration: self.default_slot_duration,
        };
        let changed = change(&mut self.state, env);
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        for (_, observer) in &self.observers {
            observer(&self.state);
        }
    }

    pub fn get_task_context(&self, task_id: &str) -> Option<TaskContext<'_>> {
        find_context(&self.state.tasks, task_id)
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.get_task_context(task_id).map(|context| context.task())
    }

    /// Root tasks are prepended; children are appended to their parent.
    pub fn add_task(&mut self, title: &str, parent_id: Option<&str>) -> Option<String> {
        let id = Uuid::new_v4().to_string();
        let mut task = Task::new(id.clone(), title);
        task.parent_id = parent_id.map(ToOwned::to_owned);

        let added = self.commit(|state, _| match parent_id {
            Some(parent_id) => match find_task_mut(&mut state.tasks, parent_id) {
                Some(parent) => {
                    parent.subtasks.push(task);
                    true
                }
                None => false,
            },
            None => {
                state.tasks.insert(0, task);
                true
            }
        });
        added.then_some(id)
    }

    /// Merges `patch`. The completion timestamp follows `is_done` transitions.
    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> bool {
        self.commit(|state, env| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            apply_task_patch(task, patch, env.now);
            true
        })
    }

    pub fn update_category_label(&mut self, category: CategoryId, label: &str) -> bool {
        self.commit(|state, _| {
            state.category_labels.insert(category, label.to_string());
            true
        })
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        self.commit(|state, _| take_task(&mut state.tasks, task_id).is_some())
    }

    /// Appends the task to `new_parent_id`'s children, or to the root.
    pub fn move_task(&mut self, task_id: &str, new_parent_id: Option<&str>) -> bool {
        self.commit(|state, _| {
            let Some(task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            match new_parent_id {
                Some(parent_id) => append_child_or_root(&mut state.tasks, task, parent_id, usize::MAX),
                None => push_root(&mut state.tasks, task),
            }
            true
        })
    }

    pub fn move_task_to_status(&mut self, task_id: &str, status: TaskStatus) -> bool {
        self.commit(|state, _| {
            let Some(mut task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            task.status = status;
            push_root(&mut state.tasks, task);
            true
        })
    }

    /// `index` counts root tasks with `status` only; past the end lands after the last of them.
    pub fn move_task_to_status_at_index(&mut self, task_id: &str, status: TaskStatus, index: usize) -> bool {
        self.commit(|state, _| {
            let Some(mut task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            task.status = status;
            task.parent_id = None;

            let root = &mut state.tasks;
            let status_indices: Vec<usize> = root
                .iter()
                .enumerate()
                .filter(|(_, candidate)| candidate.status == status)
                .map(|(position, _)| position)
                .collect();
            let insert_at = match status_indices.last() {
                None => root.len(),
                Some(last) if index >= status_indices.len() => last + 1,
                Some(_) => status_indices[index],
            };
            root.insert(insert_at, task);
            true
        })
    }

    pub fn reorder_task(&mut self, task_id: &str, new_index: usize) -> bool {
        self.commit(|state, _| {
            let Some(path) = find_path(&state.tasks, task_id) else {
                return false;
            };
            let Some((current, parent_path)) = path.split_last() else {
                return false;
            };
            let siblings = siblings_at(&mut state.tasks, parent_path);
            let task = siblings.remove(*current);
            let target = new_index.min(siblings.len());
            siblings.insert(target, task);
            true
        })
    }

    /// Moves the task into the target's sequence at the target's index, adopting its status and
    /// parent. Moving a task next to its own descendant does nothing.
    pub fn move_task_before(&mut self, task_id: &str, target_id: &str) -> bool {
        self.commit(|state, _| {
            let (Some(path), Some(target_path)) =
                (find_path(&state.tasks, task_id), find_path(&state.tasks, target_id))
            else {
                return false;
            };
            if task_id == target_id || target_path.starts_with(&path) {
                return false;
            }
            let (target_status, target_parent) = {
                let target = task_at(&state.tasks, &target_path);
                (target.status, target.parent_id.clone())
            };
            let Some((&target_index, target_parent_path)) = target_path.split_last() else {
                return false;
            };

            if path.len() == target_path.len() && path[..path.len() - 1] == *target_parent_path {
                let siblings = siblings_at(&mut state.tasks, target_parent_path);
                let mut task = siblings.remove(path[path.len() - 1]);
                task.status = target_status;
                task.parent_id = target_parent;
                siblings.insert(target_index.min(siblings.len()), task);
                return true;
            }

            let Some(mut task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            task.status = target_status;
            task.parent_id = target_parent;
            let Some(shifted_target) = find_path(&state.tasks, target_id) else {
                push_root(&mut state.tasks, task);
                return true;
            };
            let Some((&index, parent_path)) = shifted_target.split_last() else {
                return false;
            };
            siblings_at(&mut state.tasks, parent_path).insert(index, task);
            true
        })
    }

    pub fn move_task_to_root_at_index(&mut self, task_id: &str, index: usize) -> bool {
        self.commit(|state, _| {
            let Some(mut task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            task.parent_id = None;
            let target = index.min(state.tasks.len());
            state.tasks.insert(target, task);
            true
        })
    }

    pub fn move_task_to_root_at_index_with_status(&mut self, task_id: &str, status: TaskStatus, index: usize) -> bool {
        self.commit(|state, _| {
            let Some(mut task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            task.parent_id = None;
            task.status = status;
            let target = index.min(state.tasks.len());
            state.tasks.insert(target, task);
            true
        })
    }

    /// Reparents under `parent_id` at `index`. A parent that vanished with the moved subtree
    /// sends the task to the end of the root.
    pub fn move_subtask_to_index(&mut self, task_id: &str, parent_id: &str, index: usize) -> bool {
        self.commit(|state, _| {
            let Some(task) = take_task(&mut state.tasks, task_id) else {
                return false;
            };
            append_child_or_root(&mut state.tasks, task, parent_id, index);
            true
        })
    }

    pub fn toggle_collapse(&mut self, task_id: &str) -> bool {
        self.commit(|state, _| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            task.is_collapsed = !task.is_collapsed;
            true
        })
    }

    /// Leaves only; a task with children is left alone.
    pub fn toggle_done(&mut self, task_id: &str) -> bool {
        self.commit(|state, env| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            if task.has_subtasks() {
                return false;
            }
            task.is_done = !task.is_done;
            task.completed_at = task.is_done.then_some(env.now);
            true
        })
    }

    pub fn archive_task(&mut self, task_id: &str) -> bool {
        self.commit(|state, _| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            task.is_archived = true;
            true
        })
    }

    pub fn unarchive_task(&mut self, task_id: &str) -> bool {
        self.commit(|state, _| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            unarchive_tree(task);
            true
        })
    }

    pub fn archive_done_tasks(&mut self) -> bool {
        self.commit(|state, _| {
            archive_done_recursive(&mut state.tasks);
            true
        })
    }

    pub fn archive_done_in_tree(&mut self, task_id: &str) -> bool {
        self.commit(|state, _| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            archive_done_recursive(std::slice::from_mut(task));
            true
        })
    }

    pub fn add_scheduled_slot(&mut self, task_id: &str, start: DateTime<Utc>, duration: Option<u32>) -> Option<String> {
        let slot_id = Uuid::new_v4().to_string();
        let added = self.commit(|state, env| {
            let Some(task) = find_task_mut(&mut state.tasks, task_id) else {
                return false;
            };
            task.scheduled_times.push(ScheduledTime {
                id: slot_id.clone(),
                start,
                duration: positive_or(duration, env.default_slot_duration),
            });
            resolve_day(state, local_date(start, env.timezone), &slot_id, env.timezone);
            true
        });
        added.then_some(slot_id)
    }

    pub fn update_scheduled_slot_time(&mut self, slot_id: &str, start: DateTime<Utc>) -> bool {
        self.commit(|state, env| {
            let Some(slot) = find_slot_mut(&mut state.tasks, slot_id) else {
                return false;
            };
            slot.start = start;
            resolve_day(state, local_date(start, env.timezone), slot_id, env.timezone);
            true
        })
    }

    /// Resizes a task block; `start_minutes` moves its start within the same day.
    pub fn update_scheduled_slot_duration(&mut self, slot_id: &str, duration: u32, start_minutes: Option<i32>) -> bool {
        self.commit(|state, env| {
            let Some(slot) = find_slot_mut(&mut state.tasks, slot_id) else {
                return false;
            };
            let day = reshape_block(&mut slot.start, &mut slot.duration, duration, start_minutes, env);
            resolve_day(state, day, slot_id, env.timezone);
            true
        })
    }

    pub fn remove_scheduled_slot(&mut self, slot_id: &str) -> bool {
        self.commit(|state, _| remove_slot(&mut state.tasks, slot_id))
    }

    pub fn add_calendar_draft_slot(&mut self, start: DateTime<Utc>, duration: Option<u32>, title: Option<&str>) -> String {
        let slot_id = Uuid::new_v4().to_string();
        self.commit(|state, env| {
            state.calendar_draft_slots.push(CalendarDraftSlot {
                id: slot_id.clone(),
                title: draft_title(title.unwrap_or_default()),
                start,
                duration: positive_or(duration, env.default_slot_duration),
                category: None,
                description: String::new(),
                due_date: None,
                importance: Default::default(),
                urgency: Default::default(),
            });
            resolve_day(state, local_date(start, env.timezone), &slot_id, env.timezone);
            true
        });
        slot_id
    }

    pub fn draft_slot(&self, slot_id: &str) -> Option<&CalendarDraftSlot> {
        self.state
            .calendar_draft_slots
            .iter()
            .find(|slot| slot.id == slot_id)
    }

    pub fn update_calendar_draft_slot_time(&mut self, slot_id: &str, start: DateTime<Utc>) -> bool {
        self.commit(|state, env| {
            let Some(slot) = find_draft_mut(&mut state.calendar_draft_slots, slot_id) else {
                return false;
            };
            slot.start = start;
            resolve_day(state, local_date(start, env.timezone), slot_id, env.timezone);
            true
        })
    }

    pub fn update_calendar_draft_slot_duration(&mut self, slot_id: &str, duration: u32, start_minutes: Option<i32>) -> bool {
        self.commit(|state, env| {
            let Some(slot) = find_draft_mut(&mut state.calendar_draft_slots, slot_id) else {
                return false;
            };
            let day = reshape_block(&mut slot.start, &mut slot.duration, duration, start_minutes, env);
            resolve_day(state, day, slot_id, env.timezone);
            true
        })
    }

    pub fn update_calendar_draft_slot_title(&mut self, slot_id: &str, title: &str) -> bool {
        self.commit(|state, _| {
            let Some(slot) = find_draft_mut(&mut state.calendar_draft_slots, slot_id) else {
                return false;
            };
            slot.title = draft_title(title);
            true
        })
    }

    pub fn update_calendar_draft_slot(&mut self, slot_id: &str, patch: DraftSlotPatch) -> bool {
        self.commit(|state, _| {
            let Some(slot) = find_draft_mut(&mut state.calendar_draft_slots, slot_id) else {
                return false;
            };
            if let Some(title) = patch.title {
                slot.title = draft_title(&title);
            }
            if let Some(category) = patch.category {
                slot.category = category;
            }
            if let Some(description) = patch.description {
                slot.description = description;
            }
            if let Some(due_date) = patch.due_date {
                slot.due_date = due_date;
            }
            if let Some(importance) = patch.importance {
                slot.importance = importance;
            }
            if let Some(urgency) = patch.urgency {
                slot.urgency = urgency;
            }
            true
        })
    }

    pub fn remove_calendar_draft_slot(&mut self, slot_id: &str) -> bool {
        self.commit(|state, _| {
            let before = state.calendar_draft_slots.len();
            state.calendar_draft_slots.retain(|slot| slot.id != slot_id);
            state.calendar_draft_slots.len() != before
        })
    }

    /// Replaces the draft with a new root inbox task owning one block at the same place.
    pub fn convert_draft_slot_to_task(&mut self, slot_id: &str) -> Option<String> {
        let task_id = Uuid::new_v4().to_string();
        let converted = self.commit(|state, _| {
            let Some(position) = state
                .calendar_draft_slots
                .iter()
                .position(|slot| slot.id == slot_id)
            else {
                return false;
            };
            let draft = state.calendar_draft_slots.remove(position);
            let mut task = Task::new(task_id.clone(), draft.title);
            task.description = draft.description;
            task.due_date = draft.due_date;
            task.category = draft.category;
            task.importance = draft.importance;
            task.urgency = draft.urgency;
            task.scheduled_times.push(ScheduledTime {
                id: Uuid::new_v4().to_string(),
                start: draft.start,
                duration: draft.duration,
            });
            state.tasks.push(task);
            true
        });
        converted.then_some(task_id)
    }

    /// Task blocks, drafts and external events whose local start date is `day`.
    pub fn slots_for_day(&self, day: NaiveDate, external_events: &[ExternalEvent]) -> Vec<CalendarSlot> {
        let mut slots = Vec::new();
        collect_calendar_slots(&self.state.tasks, day, self.timezone, &mut slots);
        for draft in &self.state.calendar_draft_slots {
            if local_date(draft.start, self.timezone) != day {
                continue;
            }
            slots.push(CalendarSlot {
                id: draft.id.clone(),
                task_id: draft.id.clone(),
                slot_type: SlotType::Draft,
                title: if draft.title.is_empty() {
                    DEFAULT_CALENDAR_DRAFT_TITLE.to_string()
                } else {
                    draft.title.clone()
                },
                category: draft.category,
                start: draft.start,
                duration: draft.duration,
            });
        }
        for event in external_events {
            if local_date(event.start, self.timezone) != day {
                continue;
            }
            slots.push(CalendarSlot {
                id: event.id.clone(),
                task_id: event.id.clone(),
                slot_type: SlotType::External,
                title: event.title.clone(),
                category: None,
                start: event.start,
                duration: event.duration,
            });
        }
        slots
    }
}

fn apply_task_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) {
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(category) = patch.category {
        task.category = category;
    }
    if let Some(importance) = patch.importance {
        task.importance = importance;
    }
    if let Some(urgency) = patch.urgency {
        task.urgency = urgency;
    }
    if let Some(is_collapsed) = patch.is_collapsed {
        task.is_collapsed = is_collapsed;
    }
    if let Some(is_archived) = patch.is_archived {
        task.is_archived = is_archived;
    }
    if let Some(is_done) = patch.is_done {
        if is_done && !task.is_done {
            task.completed_at = Some(now);
        } else if !is_done {
            task.completed_at = None;
        }
        task.is_done = is_done;
    }
}

fn positive_or(duration: Option<u32>, fallback: u32) -> u32 {
    duration
        .filter(|value| *value > 0)
        .unwrap_or(fallback)
        .min(MAX_BLOCK_MINUTES)
}

fn draft_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_CALENDAR_DRAFT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Applies a resize to one block and returns the local day to re-resolve.
fn reshape_block(
    start: &mut DateTime<Utc>,
    duration: &mut u32,
    next_duration: u32,
    start_minutes: Option<i32>,
    env: MutationEnv,
) -> NaiveDate {
    *duration = positive_or(Some(next_duration), env.default_slot_duration);
    let day = local_date(*start, env.timezone);
    if let Some(start_minutes) = start_minutes {
        *start = instant_at_minutes(day, start_minutes, env.timezone);
    }
    local_date(*start, env.timezone)
}

fn find_context<'a>(tasks: &'a [Task], task_id: &str) -> Option<TaskContext<'a>> {
    for (index, task) in tasks.iter().enumerate() {
        if task.id == task_id {
            return Some(TaskContext {
                siblings: tasks,
                index,
            });
        }
        if let Some(found) = find_context(&task.subtasks, task_id) {
            return Some(found);
        }
    }
    None
}

/// Index path from the root to `task_id`.
fn find_path(tasks: &[Task], task_id: &str) -> Option<Vec<usize>> {
    for (index, task) in tasks.iter().enumerate() {
        if task.id == task_id {
            return Some(vec![index]);
        }
        if let Some(mut rest) = find_path(&task.subtasks, task_id) {
            rest.insert(0, index);
            return Some(rest);
        }
    }
    None
}

fn siblings_at<'a>(tasks: &'a mut Vec<Task>, parent_path: &[usize]) -> &'a mut Vec<Task> {
    let mut current = tasks;
    for &index in parent_path {
        current = &mut current[index].subtasks;
    }
    current
}

fn task_at<'a>(tasks: &'a [Task], path: &[usize]) -> &'a Task {
    let mut current = &tasks[path[0]];
    for &index in &path[1..] {
        current = &current.subtasks[index];
    }
    current
}

fn find_task_mut<'a>(tasks: &'a mut [Task], task_id: &str) -> Option<&'a mut Task> {
    for task in tasks.iter_mut() {
        if task.id == task_id {
            return Some(task);
        }
        if let Some(found) = find_task_mut(&mut task.subtasks, task_id) {
            return Some(found);
        }
    }
    None
}

fn take_task(tasks: &mut Vec<Task>, task_id: &str) -> Option<Task> {
    let path = find_path(tasks, task_id)?;
    let (index, parent_path) = path.split_last()?;
    Some(siblings_at(tasks, parent_path).remove(*index))
}

fn push_root(tasks: &mut Vec<Task>, mut task: Task) {
    task.parent_id = None;
    tasks.push(task);
}

fn append_child_or_root(tasks: &mut Vec<Task>, mut task: Task, parent_id: &str, index: usize) {
    match find_task_mut(tasks, parent_id) {
        Some(parent) => {
            task.parent_id = Some(parent.id.clone());
            let target = index.min(parent.subtasks.len());
            parent.subtasks.insert(target, task);
        }
        None => push_root(tasks, task),
    }
}

fn unarchive_tree(task: &mut Task) {
    task.is_archived = false;
    for child in &mut task.subtasks {
        unarchive_tree(child);
    }
}

fn archive_done_recursive(tasks: &mut [Task]) {
    for task in tasks {
        if task.is_archived {
            continue;
        }
        if task.is_effectively_done() {
            task.is_archived = true;
        } else if task.has_subtasks() {
            archive_done_recursive(&mut task.subtasks);
        }
    }
}

fn find_slot_mut<'a>(tasks: &'a mut [Task], slot_id: &str) -> Option<&'a mut ScheduledTime> {
    for task in tasks.iter_mut() {
        if let Some(slot) = task.scheduled_times.iter_mut().find(|slot| slot.id == slot_id) {
            return Some(slot);
        }
        if let Some(found) = find_slot_mut(&mut task.subtasks, slot_id) {
            return Some(found);
        }
    }
    None
}

fn remove_slot(tasks: &mut [Task], slot_id: &str) -> bool {
    for task in tasks.iter_mut() {
        if let Some(index) = task.scheduled_times.iter().position(|slot| slot.id == slot_id) {
            task.scheduled_times.remove(index);
            return true;
        }
        if remove_slot(&mut task.subtasks, slot_id) {
            return true;
        }
    }
    false
}

fn find_draft_mut<'a>(slots: &'a mut [CalendarDraftSlot], slot_id: &str) -> Option<&'a mut CalendarDraftSlot> {
    slots.iter_mut().find(|slot| slot.id == slot_id)
}

fn block_minutes(duration: u32) -> i32 {
    i32::try_from(duration.min(MAX_BLOCK_MINUTES)).unwrap_or(DAY_MINUTES)
}

fn schedule_item(id: &str, start: DateTime<Utc>, duration: u32, timezone: Tz) -> ScheduleItem {
    let duration = if duration == 0 { DEFAULT_SLOT_DURATION } else { duration };
    ScheduleItem::new(id, minutes_in_day(start, timezone), block_minutes(duration))
}

fn collect_task_items(tasks: &[Task], day: NaiveDate, timezone: Tz, items: &mut Vec<ScheduleItem>) {
    for task in tasks {
        for slot in &task.scheduled_times {
            if local_date(slot.start, timezone) == day {
                items.push(schedule_item(&slot.id, slot.start, slot.duration, timezone));
            }
        }
        collect_task_items(&task.subtasks, day, timezone, items);
    }
}

fn write_back_task_slots(tasks: &mut [Task], resolved: &HashMap<String, i32>, day: NaiveDate, timezone: Tz) {
    for task in tasks {
        for slot in &mut task.scheduled_times {
            if let Some(minutes) = resolved.get(&slot.id) {
                slot.start = instant_at_minutes(day, *minutes, timezone);
            }
        }
        write_back_task_slots(&mut task.subtasks, resolved, day, timezone);
    }
}

/// Re-lays out every task block and draft on `day` with `pinned_id` fixed.
fn resolve_day(state: &mut PlannerState, day: NaiveDate, pinned_id: &str, timezone: Tz) {
    let mut items = Vec::new();
    collect_task_items(&state.tasks, day, timezone, &mut items);
    for draft in &state.calendar_draft_slots {
        if local_date(draft.start, timezone) == day {
            items.push(schedule_item(&draft.id, draft.start, draft.duration, timezone));
        }
    }
    if items.is_empty() {
        return;
    }

    // A block pushed past midnight stays on `day`, flush with its end.
    let resolved: HashMap<String, i32> = resolve_schedule(&items, Some(pinned_id))
        .into_iter()
        .map(|item| {
            let start = if item.id == pinned_id {
                item.start_minutes
            } else {
                item.start_minutes.min(DAY_MINUTES - item.duration).max(0)
            };
            (item.id, start)
        })
        .collect();
    write_back_task_slots(&mut state.tasks, &resolved, day, timezone);
    for draft in &mut state.calendar_draft_slots {
        if let Some(minutes) = resolved.get(&draft.id) {
            draft.start = instant_at_minutes(day, *minutes, timezone);
        }
    }
    debug!(slot_id = %pinned_id, day = %day, blocks = resolved.len(), "resolved day schedule");
}

fn collect_calendar_slots(tasks: &[Task], day: NaiveDate, timezone: Tz, slots: &mut Vec<CalendarSlot>) {
    for task in tasks {
        for slot in &task.scheduled_times {
            if local_date(slot.start, timezone) != day {
                continue;
            }
            slots.push(CalendarSlot {
                id: slot.id.clone(),
                task_id: task.id.clone(),
                slot_type: SlotType::Task,
                title: task.title.clone(),
                category: task.category,
                start: slot.start,
                duration: slot.duration,
            });
        }
        collect_calendar_slots(&task.subtasks, day, timezone, slots);
    }
}
