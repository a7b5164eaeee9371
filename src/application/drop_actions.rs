use crate::application::drag_engine::{DragEngine, DropHandler, DropInfo};
use crate::application::task_store::TaskStore;
use crate::domain::calendar_preview::{PreviewSlot, ResizePreview};
use crate::domain::drop_target::{DragOver, DragSource, ListOver};
use crate::domain::flat_list::{
    DropParent, FlatTask, compute_flat_drop_index, done_tree, flatten_done_tree, flatten_roots, is_done_visible,
    map_filtered_index, remove_subtree, resolve_drop_parent,
};
use crate::domain::models::{DragPayload, SlotType, Task, TaskPatch, TaskStatus};
use crate::domain::time_grid::instant_at_minutes;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

pub const INBOX_LIST_ID: &str = "inbox";
pub const DONE_LIST_ID: &str = "done";

/// Rows of the inbox list.
pub fn inbox_tasks(tasks: &[Task]) -> Vec<FlatTask<'_>> {
    flatten_roots(tasks.iter().filter(|task| task.status == TaskStatus::Inbox))
}

/// Rows of a board column: unarchived roots with `status`, without finished or archived rows.
pub fn board_column_tasks(tasks: &[Task], status: TaskStatus) -> Vec<FlatTask<'_>> {
    let mut flat = flatten_roots(
        tasks
            .iter()
            .filter(|task| task.status == status && !task.is_archived),
    );
    flat.retain(|entry| is_column_visible(entry.task));
    flat
}

/// Rows of the done column. Collapse state there is local to the column.
pub fn done_column_tasks<'a>(tasks: &'a [Task], collapsed_ids: &HashSet<String>) -> Vec<FlatTask<'a>> {
    flatten_done_tree(&done_tree(tasks), collapsed_ids)
        .into_iter()
        .map(|row| row.entry)
        .collect()
}

fn is_column_visible(task: &Task) -> bool {
    !task.is_effectively_done() && !task.is_archived
}

fn list_over<'a>(info: &'a DropInfo<DragPayload>, list_id: &str) -> Option<&'a ListOver> {
    info.over
        .as_ref()
        .and_then(DragOver::as_list)
        .filter(|over| over.list_id == list_id)
}

fn from_calendar(info: &DropInfo<DragPayload>) -> bool {
    info.source.as_ref().is_some_and(DragSource::is_calendar)
}

/// Index in `siblings` once `dragged_id` has been taken out of them.
fn index_without(
    siblings: &[Task],
    dragged_id: &str,
    filtered_index: usize,
    visible: impl Fn(&Task) -> bool,
) -> usize {
    let index = map_filtered_index(siblings, filtered_index, |task| task.id != dragged_id && visible(task));
    match siblings.iter().position(|task| task.id == dragged_id) {
        Some(position) if position < index => index - 1,
        _ => index,
    }
}

/// Where the dragged subtree lands once it is taken out of `flat`.
fn landing_without(flat: &[FlatTask<'_>], dragged_id: &str, over: &ListOver) -> DropParent {
    let removed = remove_subtree(flat, dragged_id);
    let insert_position = compute_flat_drop_index(&removed.filtered, over);
    resolve_drop_parent(&removed.filtered, insert_position, over.depth)
}

pub fn drop_on_inbox(store: &mut TaskStore, dragged_id: &str, info: &DropInfo<DragPayload>) -> bool {
    let Some(over) = list_over(info, INBOX_LIST_ID) else {
        return false;
    };
    if from_calendar(info) {
        return false;
    }

    let landing = landing_without(&inbox_tasks(store.tasks()), dragged_id, over);
    debug!(task_id = %dragged_id, parent = ?landing.parent_id, index = landing.child_index, "inbox drop");
    match landing.parent_id {
        Some(parent_id) => store.move_subtask_to_index(dragged_id, &parent_id, landing.child_index),
        None => store.move_task_to_status_at_index(dragged_id, TaskStatus::Inbox, landing.child_index),
    }
}

/// Drop into the `todo` or `in_progress` column. A finished task dropped here is reopened.
pub fn drop_on_board_column(
    store: &mut TaskStore,
    status: TaskStatus,
    dragged_id: &str,
    info: &DropInfo<DragPayload>,
) -> bool {
    let Some(over) = list_over(info, status.as_str()) else {
        return false;
    };
    if from_calendar(info) {
        return false;
    }

    let landing = landing_without(&board_column_tasks(store.tasks(), status), dragged_id, over);
    debug!(task_id = %dragged_id, status = status.as_str(), parent = ?landing.parent_id, "board drop");

    let mut changed = false;
    if store.find_task(dragged_id).is_some_and(|task| task.is_done) {
        changed = store.update_task(dragged_id, TaskPatch::done(false));
    }

    match landing.parent_id {
        Some(parent_id) => {
            let Some(index) = store
                .find_task(&parent_id)
                .map(|parent| index_without(&parent.subtasks, dragged_id, landing.child_index, is_column_visible))
            else {
                return changed;
            };
            store.move_subtask_to_index(dragged_id, &parent_id, index) || changed
        }
        None => {
            let index = index_without(store.tasks(), dragged_id, landing.child_index, |task| {
                task.status == status && is_column_visible(task)
            });
            store.move_task_to_root_at_index_with_status(dragged_id, status, index) || changed
        }
    }
}

/// Drop into the done column. From the column itself this reorders; from elsewhere it finishes
/// the task and nests it when a parent was targeted.
pub fn drop_on_done_column(
    store: &mut TaskStore,
    collapsed_ids: &HashSet<String>,
    dragged_id: &str,
    info: &DropInfo<DragPayload>,
) -> bool {
    let Some(over) = list_over(info, DONE_LIST_ID) else {
        return false;
    };
    if from_calendar(info) {
        return false;
    }
    let from_done = info
        .source
        .as_ref()
        .is_some_and(|source| source.is_list(DONE_LIST_ID));

    let landing = {
        let flat = done_column_tasks(store.tasks(), collapsed_ids);
        if from_done {
            landing_without(&flat, dragged_id, over)
        } else {
            let insert_position = compute_flat_drop_index(&flat, over);
            resolve_drop_parent(&flat, insert_position, over.depth)
        }
    };
    debug!(task_id = %dragged_id, from_done, parent = ?landing.parent_id, "done drop");

    let mut changed = false;
    if !from_done && store.find_task(dragged_id).is_some_and(|task| !task.has_subtasks()) {
        changed = store.update_task(dragged_id, TaskPatch::done(true));
    }

    match landing.parent_id {
        Some(parent_id) => {
            let Some(index) = store
                .find_task(&parent_id)
                .map(|parent| index_without(&parent.subtasks, dragged_id, landing.child_index, is_done_visible))
            else {
                return changed;
            };
            store.move_subtask_to_index(dragged_id, &parent_id, index) || changed
        }
        None if from_done => {
            let index = index_without(store.tasks(), dragged_id, landing.child_index, is_done_visible);
            store.move_task_to_root_at_index(dragged_id, index) || changed
        }
        None => changed,
    }
}

/// Drop onto the day column for `date`. List drags schedule a new block; calendar drags move one.
pub fn drop_on_calendar_day(
    store: &mut TaskStore,
    date: NaiveDate,
    dragged_id: &str,
    info: &DropInfo<DragPayload>,
) -> bool {
    let Some(over) = info
        .over
        .as_ref()
        .and_then(DragOver::as_calendar)
        .filter(|over| over.date == date)
    else {
        return false;
    };
    let start = instant_at_minutes(date, over.minutes, store.timezone());
    debug!(item_id = %dragged_id, day = %date, minutes = over.minutes, "calendar drop");

    if matches!(info.source, Some(DragSource::List { .. })) {
        return store.add_scheduled_slot(dragged_id, start, None).is_some();
    }
    if info.payload.is_draft_slot() {
        store.update_calendar_draft_slot_time(dragged_id, start)
    } else {
        store.update_scheduled_slot_time(dragged_id, start)
    }
}

pub fn inbox_handler() -> DropHandler<DragPayload, TaskStore> {
    Box::new(|store: &mut TaskStore, dragged_id: &str, info: &DropInfo<DragPayload>| {
        drop_on_inbox(store, dragged_id, info);
    })
}

pub fn board_column_handler(status: TaskStatus) -> DropHandler<DragPayload, TaskStore> {
    Box::new(move |store: &mut TaskStore, dragged_id: &str, info: &DropInfo<DragPayload>| {
        drop_on_board_column(store, status, dragged_id, info);
    })
}

pub fn done_column_handler(collapsed_ids: HashSet<String>) -> DropHandler<DragPayload, TaskStore> {
    Box::new(move |store: &mut TaskStore, dragged_id: &str, info: &DropInfo<DragPayload>| {
        drop_on_done_column(store, &collapsed_ids, dragged_id, info);
    })
}

pub fn calendar_day_handler(date: NaiveDate) -> DropHandler<DragPayload, TaskStore> {
    Box::new(move |store: &mut TaskStore, dragged_id: &str, info: &DropInfo<DragPayload>| {
        drop_on_calendar_day(store, date, dragged_id, info);
    })
}

/// Tracks the block being resized and commits the final size.
#[derive(Debug, Clone, Default)]
pub struct ResizeController {
    preview: Option<ResizePreview>,
}

impl ResizeController {
    pub fn preview(&self) -> Option<&ResizePreview> {
        self.preview.as_ref()
    }

    /// Starts a resize unless a drag is active. New drags are blocked until `end`.
    pub fn begin<D: Clone, C>(&mut self, engine: &mut DragEngine<D, C>, preview: ResizePreview) -> bool {
        if engine.is_dragging() {
            return false;
        }
        engine.set_resizing(true);
        self.preview = Some(preview);
        true
    }

    pub fn change(&mut self, preview: ResizePreview) -> bool {
        match self.preview.as_mut() {
            Some(current) if current.slot_id == preview.slot_id => {
                *current = preview;
                true
            }
            _ => false,
        }
    }

    pub fn end<D: Clone, C>(
        &mut self,
        engine: &mut DragEngine<D, C>,
        store: &mut TaskStore,
        slot: &PreviewSlot,
        duration: u32,
        start_minutes: Option<i32>,
    ) -> bool {
        self.preview = None;
        engine.set_resizing(false);
        commit_resize(store, slot, duration, start_minutes)
    }
}

/// Writes a resize back to the store when the duration or start actually changed.
pub fn commit_resize(store: &mut TaskStore, slot: &PreviewSlot, duration: u32, start_minutes: Option<i32>) -> bool {
    let original_duration = if slot.slot.duration > 0 {
        slot.slot.duration
    } else {
        store.default_slot_duration()
    };
    let original_start = slot.display_minutes(store.timezone());
    let start_changed = start_minutes.is_some_and(|minutes| minutes != original_start);
    if duration == original_duration && !start_changed {
        return false;
    }

    match slot.slot.slot_type {
        SlotType::Draft => store.update_calendar_draft_slot_duration(&slot.slot.id, duration, start_minutes),
        SlotType::Task => store.update_scheduled_slot_duration(&slot.slot.id, duration, start_minutes),
        SlotType::External => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::drag_engine::{DraggableConfig, ElementRole, PointerButton, PointerEvent};
    use crate::domain::drop_target::{CalendarOver, Placement};
    use crate::domain::models::{CalendarSlot, DEFAULT_SLOT_DURATION, PlannerState, ScheduledTime};
    use crate::domain::time_grid::{Point, Rect};
    use crate::infrastructure::config::DragConfig;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        let mut task = Task::new(id, id);
        task.status = status;
        task
    }

    fn store_with(tasks: Vec<Task>) -> TaskStore {
        let now = fixed_time("2026-02-16T08:00:00Z");
        let state = PlannerState {
            tasks,
            ..PlannerState::default()
        };
        TaskStore::new(state).with_now_provider(Arc::new(move || now))
    }

    fn root_ids(store: &TaskStore) -> Vec<String> {
        store.tasks().iter().map(|task| task.id.clone()).collect()
    }

    fn list_drop(list_id: &str, item_id: Option<&str>, placement: Placement, depth: usize, source: &str) -> DropInfo<DragPayload> {
        DropInfo {
            over: Some(DragOver::List(ListOver {
                list_id: list_id.to_string(),
                item_id: item_id.map(ToOwned::to_owned),
                placement,
                depth,
            })),
            payload: DragPayload::Task(Task::new("dragged", "dragged")),
            source: Some(DragSource::list(source)),
            overlay: None,
        }
    }

    #[test]
    fn inbox_drop_before_first_item_moves_to_front() {
        let mut store = store_with(vec![
            task("a", TaskStatus::Inbox),
            task("b", TaskStatus::Inbox),
            task("c", TaskStatus::Inbox),
        ]);
        let info = list_drop(INBOX_LIST_ID, Some("a"), Placement::Before, 0, INBOX_LIST_ID);

        assert!(drop_on_inbox(&mut store, "c", &info));
        assert_eq!(root_ids(&store), vec!["c", "a", "b"]);
    }

    #[test]
    fn inbox_drop_with_indent_nests_under_the_row_above() {
        let mut store = store_with(vec![task("a", TaskStatus::Inbox), task("b", TaskStatus::Inbox)]);
        let info = list_drop(INBOX_LIST_ID, Some("a"), Placement::After, 1, INBOX_LIST_ID);

        assert!(drop_on_inbox(&mut store, "b", &info));
        assert_eq!(root_ids(&store), vec!["a"]);
        let parent = store.find_task("a").expect("parent");
        assert_eq!(parent.subtasks.len(), 1);
        assert_eq!(parent.subtasks[0].id, "b");
        assert_eq!(parent.subtasks[0].parent_id.as_deref(), Some("a"));
    }

    #[test]
    fn list_drops_from_the_calendar_or_for_other_lists_are_ignored() {
        let mut store = store_with(vec![task("a", TaskStatus::Inbox), task("b", TaskStatus::Inbox)]);
        let mut info = list_drop(INBOX_LIST_ID, Some("a"), Placement::Before, 0, INBOX_LIST_ID);
        info.source = Some(DragSource::Calendar { date: None });
        assert!(!drop_on_inbox(&mut store, "b", &info));

        let info = list_drop("todo", Some("a"), Placement::Before, 0, INBOX_LIST_ID);
        assert!(!drop_on_inbox(&mut store, "b", &info));
        assert_eq!(root_ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn board_drop_reopens_finished_task_and_adopts_column_status() {
        let mut finished = task("y", TaskStatus::Inbox);
        finished.is_done = true;
        finished.completed_at = Some(fixed_time("2026-02-15T08:00:00Z"));
        let mut store = store_with(vec![task("x", TaskStatus::Todo), finished]);
        let info = list_drop("todo", Some("x"), Placement::After, 0, DONE_LIST_ID);

        assert!(drop_on_board_column(&mut store, TaskStatus::Todo, "y", &info));
        assert_eq!(root_ids(&store), vec!["x", "y"]);
        let moved = store.find_task("y").expect("moved");
        assert_eq!(moved.status, TaskStatus::Todo);
        assert!(!moved.is_done);
        assert_eq!(moved.completed_at, None);
    }

    #[test]
    fn board_drop_maps_visible_index_past_hidden_rows() {
        let mut hidden = task("h", TaskStatus::Todo);
        hidden.is_archived = true;
        let mut store = store_with(vec![
            task("i", TaskStatus::Inbox),
            hidden,
            task("x", TaskStatus::Todo),
            task("p", TaskStatus::InProgress),
        ]);
        let info = list_drop("in_progress", Some("p"), Placement::Before, 0, "todo");

        assert!(drop_on_board_column(&mut store, TaskStatus::InProgress, "x", &info));
        assert_eq!(root_ids(&store), vec!["i", "h", "x", "p"]);
        assert_eq!(store.find_task("x").map(|task| task.status), Some(TaskStatus::InProgress));
    }

    #[test]
    fn done_drop_from_elsewhere_finishes_a_leaf() {
        let mut store = store_with(vec![task("t", TaskStatus::Todo)]);
        let info = list_drop(DONE_LIST_ID, None, Placement::End, 0, "todo");

        assert!(drop_on_done_column(&mut store, &HashSet::new(), "t", &info));
        let finished = store.find_task("t").expect("task");
        assert!(finished.is_done);
        assert_eq!(finished.completed_at, Some(fixed_time("2026-02-16T08:00:00Z")));
        assert_eq!(root_ids(&store), vec!["t"]);
    }

    #[test]
    fn done_drop_from_elsewhere_nests_under_targeted_parent() {
        let mut parent = task("p", TaskStatus::Todo);
        let mut done_child = Task::new("d1", "d1");
        done_child.parent_id = Some("p".to_string());
        done_child.is_done = true;
        parent.subtasks = vec![done_child];
        let mut store = store_with(vec![parent, task("t", TaskStatus::Todo)]);
        let info = list_drop(DONE_LIST_ID, Some("d1"), Placement::After, 1, "todo");

        assert!(drop_on_done_column(&mut store, &HashSet::new(), "t", &info));
        assert_eq!(root_ids(&store), vec!["p"]);
        let parent = store.find_task("p").expect("parent");
        let child_ids: Vec<&str> = parent.subtasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(child_ids, vec!["d1", "t"]);
        assert!(parent.subtasks[1].is_done);
    }

    #[test]
    fn done_drop_from_done_column_reorders_roots() {
        let mut first = task("d1", TaskStatus::Todo);
        first.is_done = true;
        let mut second = task("d2", TaskStatus::Todo);
        second.is_done = true;
        let mut store = store_with(vec![first, task("open", TaskStatus::Todo), second]);
        let info = list_drop(DONE_LIST_ID, Some("d1"), Placement::Before, 0, DONE_LIST_ID);

        assert!(drop_on_done_column(&mut store, &HashSet::new(), "d2", &info));
        assert_eq!(root_ids(&store), vec!["d2", "d1", "open"]);
        assert!(store.find_task("d2").is_some_and(|task| task.is_done));
    }

    fn calendar_drop(date: NaiveDate, minutes: i32, payload: DragPayload, source: DragSource) -> DropInfo<DragPayload> {
        DropInfo {
            over: Some(DragOver::Calendar(CalendarOver { date, minutes })),
            payload,
            source: Some(source),
            overlay: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    #[test]
    fn calendar_drop_from_a_list_schedules_a_block() {
        let mut store = store_with(vec![task("t", TaskStatus::Todo)]);
        let info = calendar_drop(
            day(),
            600,
            DragPayload::Task(task("t", TaskStatus::Todo)),
            DragSource::list("todo"),
        );

        assert!(drop_on_calendar_day(&mut store, day(), "t", &info));
        let scheduled = &store.find_task("t").expect("task").scheduled_times;
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].start, fixed_time("2026-02-16T10:00:00Z"));
        assert_eq!(scheduled[0].duration, DEFAULT_SLOT_DURATION);
    }

    #[test]
    fn calendar_drop_moves_drafts_and_task_blocks() {
        let mut owner = task("t", TaskStatus::Todo);
        owner.scheduled_times.push(ScheduledTime {
            id: "s1".to_string(),
            start: fixed_time("2026-02-16T09:00:00Z"),
            duration: 30,
        });
        let mut store = store_with(vec![owner]);
        let draft_id = store.add_calendar_draft_slot(fixed_time("2026-02-16T13:00:00Z"), Some(45), None);
        let source = DragSource::Calendar { date: Some(day()) };

        let draft_payload = DragPayload::CalendarSlot(CalendarSlot {
            id: draft_id.clone(),
            task_id: draft_id.clone(),
            slot_type: SlotType::Draft,
            title: "New slot".to_string(),
            category: None,
            start: fixed_time("2026-02-16T13:00:00Z"),
            duration: 45,
        });
        let info = calendar_drop(day(), 15 * 60, draft_payload, source.clone());
        assert!(drop_on_calendar_day(&mut store, day(), &draft_id, &info));
        assert_eq!(
            store.draft_slot(&draft_id).map(|slot| slot.start),
            Some(fixed_time("2026-02-16T15:00:00Z"))
        );

        let block_payload = DragPayload::CalendarSlot(CalendarSlot {
            id: "s1".to_string(),
            task_id: "t".to_string(),
            slot_type: SlotType::Task,
            title: "t".to_string(),
            category: None,
            start: fixed_time("2026-02-16T09:00:00Z"),
            duration: 30,
        });
        let info = calendar_drop(day(), 7 * 60, block_payload, source);
        assert!(drop_on_calendar_day(&mut store, day(), "s1", &info));
        assert_eq!(
            store.find_task("t").expect("task").scheduled_times[0].start,
            fixed_time("2026-02-16T07:00:00Z")
        );
    }

    #[test]
    fn calendar_drop_for_another_day_is_ignored() {
        let mut store = store_with(vec![task("t", TaskStatus::Todo)]);
        let other_day = NaiveDate::from_ymd_opt(2026, 2, 17).expect("valid date");
        let info = calendar_drop(
            other_day,
            600,
            DragPayload::Task(task("t", TaskStatus::Todo)),
            DragSource::list("todo"),
        );

        assert!(!drop_on_calendar_day(&mut store, day(), "t", &info));
        assert!(store.find_task("t").expect("task").scheduled_times.is_empty());
    }

    fn block_preview(start: &str, duration: u32) -> PreviewSlot {
        let start = fixed_time(start);
        PreviewSlot {
            slot: CalendarSlot {
                id: "s1".to_string(),
                task_id: "t".to_string(),
                slot_type: SlotType::Task,
                title: "t".to_string(),
                category: None,
                start,
                duration,
            },
            is_ghost: false,
            display_start: start,
            display_duration: duration,
            overlap: None,
        }
    }

    fn resize(slot_id: &str, duration: u32) -> ResizePreview {
        ResizePreview {
            slot_id: slot_id.to_string(),
            date: day(),
            duration,
            start_minutes: None,
        }
    }

    #[test]
    fn resize_preview_follows_only_the_active_block() {
        let mut engine: DragEngine<DragPayload, TaskStore> = DragEngine::new(DragConfig::default());
        let mut controller = ResizeController::default();

        assert!(controller.begin(&mut engine, resize("s1", 30)));
        assert!(engine.is_resizing());
        assert!(!controller.change(resize("other", 90)));
        assert!(controller.change(resize("s1", 60)));
        assert_eq!(controller.preview().map(|preview| preview.duration), Some(60));
    }

    #[test]
    fn resize_cannot_start_during_a_drag() {
        let mut engine: DragEngine<DragPayload, TaskStore> = DragEngine::new(DragConfig::default());
        let card = engine.mount(
            None,
            ElementRole::Item {
                list_id: "todo".to_string(),
                item_id: "t".to_string(),
                depth: 0,
                preview: false,
            },
            Rect::new(0.0, 0.0, 200.0, 40.0),
        );
        engine.register_draggable(
            card,
            DraggableConfig {
                id: "t".to_string(),
                payload: DragPayload::Task(task("t", TaskStatus::Todo)),
                source: Some(DragSource::list("todo")),
                grab_element: None,
            },
        );
        engine.pointer_down(PointerEvent {
            pointer_id: 7,
            button: PointerButton::Primary,
            position: Point::new(10.0, 10.0),
        });
        engine.pointer_move(7, Point::new(60.0, 60.0));
        assert!(engine.is_dragging());

        let mut controller = ResizeController::default();
        assert!(!controller.begin(&mut engine, resize("s1", 30)));
        assert!(controller.preview().is_none());
    }

    #[test]
    fn resize_end_commits_only_real_changes() {
        let mut owner = task("t", TaskStatus::Todo);
        owner.scheduled_times.push(ScheduledTime {
            id: "s1".to_string(),
            start: fixed_time("2026-02-16T09:00:00Z"),
            duration: 30,
        });
        let mut store = store_with(vec![owner]);
        let mut engine: DragEngine<DragPayload, TaskStore> = DragEngine::new(DragConfig::default());
        let mut controller = ResizeController::default();
        let slot = block_preview("2026-02-16T09:00:00Z", 30);

        controller.begin(&mut engine, resize("s1", 30));
        assert!(!controller.end(&mut engine, &mut store, &slot, 30, Some(540)));
        assert!(!engine.is_resizing());
        assert!(controller.preview().is_none());

        controller.begin(&mut engine, resize("s1", 30));
        assert!(controller.end(&mut engine, &mut store, &slot, 75, None));
        assert_eq!(store.find_task("t").expect("task").scheduled_times[0].duration, 75);
    }

    #[test]
    fn resize_of_an_unsized_block_compares_against_the_configured_default() {
        let mut owner = task("t", TaskStatus::Todo);
        owner.scheduled_times.push(ScheduledTime {
            id: "s1".to_string(),
            start: fixed_time("2026-02-16T09:00:00Z"),
            duration: 60,
        });
        let mut store = store_with(vec![owner]).with_default_slot_duration(60);
        let slot = block_preview("2026-02-16T09:00:00Z", 0);

        assert!(!commit_resize(&mut store, &slot, 60, None));
        assert!(commit_resize(&mut store, &slot, DEFAULT_SLOT_DURATION, None));
        assert_eq!(
            store.find_task("t").expect("task").scheduled_times[0].duration,
            DEFAULT_SLOT_DURATION
        );
    }
}
