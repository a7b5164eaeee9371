use crate::domain::drop_target::{DragOver, DragSource, ListOver, Placement};
use crate::domain::models::{DragPayload, Task};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTask<'a> {
    pub task: &'a Task,
    pub depth: usize,
}

/// Pre-order walk; collapsed tasks hide their children.
pub fn flatten(tasks: &[Task]) -> Vec<FlatTask<'_>> {
    let mut result = Vec::new();
    push_flattened(tasks, 0, &mut result);
    result
}

/// `flatten` over a selection of root tasks, e.g. the roots of one status column.
pub fn flatten_roots<'a>(roots: impl IntoIterator<Item = &'a Task>) -> Vec<FlatTask<'a>> {
    let mut result = Vec::new();
    for task in roots {
        push_flattened(std::slice::from_ref(task), 0, &mut result);
    }
    result
}

fn push_flattened<'a>(tasks: &'a [Task], depth: usize, result: &mut Vec<FlatTask<'a>>) {
    for task in tasks {
        result.push(FlatTask { task, depth });
        if !task.is_collapsed && task.has_subtasks() {
            push_flattened(&task.subtasks, depth + 1, result);
        }
    }
}

/// `flatten` followed by a per-entry filter. Entries keep the depth they had in the full tree.
pub fn flatten_visible(tasks: &[Task], visible: impl Fn(&Task) -> bool) -> Vec<FlatTask<'_>> {
    let mut result = flatten(tasks);
    result.retain(|entry| visible(entry.task));
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSubtree<'a> {
    pub filtered: Vec<FlatTask<'a>>,
    pub original_index: Option<usize>,
    pub original_depth: usize,
}

/// Drops the entry for `task_id` and the run of deeper entries right after it.
pub fn remove_subtree<'a>(flat: &[FlatTask<'a>], task_id: &str) -> RemovedSubtree<'a> {
    let Some(index) = flat.iter().position(|entry| entry.task.id == task_id) else {
        return RemovedSubtree {
            filtered: flat.to_vec(),
            original_index: None,
            original_depth: 0,
        };
    };
    let depth = flat[index].depth;
    let end = flat[index + 1..]
        .iter()
        .position(|entry| entry.depth <= depth)
        .map_or(flat.len(), |offset| index + 1 + offset);

    let mut filtered = Vec::with_capacity(flat.len() - (end - index));
    filtered.extend_from_slice(&flat[..index]);
    filtered.extend_from_slice(&flat[end..]);
    RemovedSubtree {
        filtered,
        original_index: Some(index),
        original_depth: depth,
    }
}

/// A row in a list while a drag may be in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEntry<'a> {
    Real(FlatTask<'a>),
    Ghost { task: &'a Task, depth: usize },
}

impl<'a> PreviewEntry<'a> {
    pub fn task(&self) -> &'a Task {
        match self {
            Self::Real(entry) => entry.task,
            Self::Ghost { task, .. } => task,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Real(entry) => entry.depth,
            Self::Ghost { depth, .. } => *depth,
        }
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self, Self::Ghost { .. })
    }
}

/// Snapshot of the drag session consumed by the preview builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewContext<'a> {
    pub active_id: Option<&'a str>,
    pub payload: Option<&'a DragPayload>,
    pub over: Option<&'a DragOver>,
    pub dragging: bool,
    pub source: Option<&'a DragSource>,
}

impl<'a> PreviewContext<'a> {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active_task(&self) -> Option<&'a Task> {
        self.payload.and_then(DragPayload::task)
    }
}

/// Flat rows for `list_id` with the dragged task spliced in as a ghost where it would land.
pub fn build_preview<'a>(
    flat: &[FlatTask<'a>],
    list_id: &str,
    ctx: &PreviewContext<'a>,
) -> Vec<PreviewEntry<'a>> {
    let real = |entries: &[FlatTask<'a>]| -> Vec<PreviewEntry<'a>> {
        entries.iter().copied().map(PreviewEntry::Real).collect()
    };

    if ctx.source.is_some_and(DragSource::is_calendar) {
        return real(flat);
    }

    let is_source_list = ctx.source.is_some_and(|source| source.is_list(list_id));
    let (base, original_index, original_depth) = match (is_source_list, ctx.active_id) {
        (true, Some(active_id)) => {
            let removed = remove_subtree(flat, active_id);
            (removed.filtered, removed.original_index, removed.original_depth)
        }
        _ => (flat.to_vec(), None, 0),
    };

    let Some(active_task) = ctx.active_task().filter(|_| ctx.dragging) else {
        return real(&base);
    };

    if let Some(over) = ctx.over.and_then(DragOver::as_list).filter(|over| over.list_id == list_id) {
        let insert_index = compute_flat_drop_index(&base, over);
        let mut next = real(&base);
        next.insert(
            insert_index,
            PreviewEntry::Ghost {
                task: active_task,
                depth: over.depth,
            },
        );
        return next;
    }

    let over_is_list = ctx.over.is_some_and(|over| over.as_list().is_some());
    if is_source_list && !over_is_list {
        let safe_index = original_index.map_or(base.len(), |index| index.min(base.len()));
        let mut next = real(&base);
        next.insert(
            safe_index,
            PreviewEntry::Ghost {
                task: active_task,
                depth: original_depth,
            },
        );
        return next;
    }

    real(&base)
}

/// Absolute insertion index for a list drop. Unknown or missing targets append.
pub fn compute_flat_drop_index(flat: &[FlatTask<'_>], over: &ListOver) -> usize {
    let Some(item_id) = over.item_id.as_deref() else {
        return flat.len();
    };
    let Some(target_index) = flat.iter().position(|entry| entry.task.id == item_id) else {
        return flat.len();
    };
    match over.placement {
        Placement::Before => target_index,
        Placement::After | Placement::End => target_index + 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropParent {
    pub parent_id: Option<String>,
    pub child_index: usize,
}

/// Parent and sibling index for an insertion at `insert_position` with nesting `depth`.
pub fn resolve_drop_parent(flat: &[FlatTask<'_>], insert_position: usize, depth: usize) -> DropParent {
    let bound = insert_position.min(flat.len());
    if depth == 0 {
        let root_count = flat[..bound].iter().filter(|entry| entry.depth == 0).count();
        return DropParent {
            parent_id: None,
            child_index: root_count,
        };
    }

    let mut parent: Option<usize> = None;
    for index in (0..bound).rev() {
        let entry_depth = flat[index].depth;
        if entry_depth == depth - 1 {
            parent = Some(index);
            break;
        }
        if entry_depth < depth - 1 {
            break;
        }
    }

    let Some(parent_index) = parent else {
        return DropParent {
            parent_id: None,
            child_index: 0,
        };
    };

    let child_index = flat[parent_index + 1..bound]
        .iter()
        .filter(|entry| entry.depth == depth)
        .count();
    DropParent {
        parent_id: Some(flat[parent_index].task.id.clone()),
        child_index,
    }
}

/// Converts an index among visible siblings into an index in the full sibling sequence.
pub fn map_filtered_index(siblings: &[Task], filtered_index: usize, visible: impl Fn(&Task) -> bool) -> usize {
    siblings
        .iter()
        .enumerate()
        .filter(|(_, task)| visible(task))
        .nth(filtered_index)
        .map_or(siblings.len(), |(index, _)| index)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndentGeometry {
    pub indent_px: f64,
    pub list_padding_px: f64,
}

impl Default for IndentGeometry {
    fn default() -> Self {
        Self {
            indent_px: crate::infrastructure::config::DEFAULT_INDENT_PX,
            list_padding_px: crate::infrastructure::config::DEFAULT_LIST_PADDING_PX,
        }
    }
}

/// Nesting depth for a card whose left edge sits at `card_left_x`.
///
/// `neighbor_depth` is the next real item's depth for `After` placements and the previous real
/// item's depth for `Before`. The result never exceeds the row above plus one and never goes
/// below the row beneath.
pub fn compute_depth_from_x(
    card_left_x: f64,
    list_left: f64,
    placement: Placement,
    item_depth: usize,
    neighbor_depth: Option<usize>,
    geometry: IndentGeometry,
) -> usize {
    let item_depth = item_depth as i64;
    let neighbor_depth = neighbor_depth.map(|depth| depth as i64);
    let (above, below) = match placement {
        Placement::Before => (neighbor_depth.unwrap_or(-1), item_depth),
        Placement::After | Placement::End => (item_depth, neighbor_depth.unwrap_or(0)),
    };

    let max_depth = above + 1;
    let min_depth = below.max(0);
    if min_depth > max_depth {
        return max_depth.max(0) as usize;
    }

    let relative_x = card_left_x - (list_left + geometry.list_padding_px);
    let indent = if geometry.indent_px > 0.0 {
        geometry.indent_px
    } else {
        crate::infrastructure::config::DEFAULT_INDENT_PX
    };
    let raw_depth = (relative_x / indent).floor() as i64;
    raw_depth.min(max_depth).max(min_depth) as usize
}

pub fn is_done_visible(task: &Task) -> bool {
    task.is_done || task.subtasks.iter().any(is_done_visible)
}

/// Node of the done column: done tasks and the ancestors needed to show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoneViewItem<'a> {
    pub task: &'a Task,
    pub is_done_leaf: bool,
    pub children: Vec<DoneViewItem<'a>>,
}

pub fn done_tree(tasks: &[Task]) -> Vec<DoneViewItem<'_>> {
    let mut result = Vec::new();
    for task in tasks {
        if task.is_archived {
            continue;
        }
        if task.is_done {
            result.push(DoneViewItem {
                task,
                is_done_leaf: true,
                children: done_tree(&task.subtasks),
            });
        } else if task.has_subtasks() {
            let all_done = task.subtasks.iter().all(Task::is_effectively_done);
            let done_children = done_tree(&task.subtasks);
            if all_done || !done_children.is_empty() {
                result.push(DoneViewItem {
                    task,
                    is_done_leaf: false,
                    children: done_children,
                });
            }
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatDoneTask<'a> {
    pub entry: FlatTask<'a>,
    pub is_done_leaf: bool,
}

/// Collapse state in the done column is view-local, hence the explicit id set.
pub fn flatten_done_tree<'a>(tree: &[DoneViewItem<'a>], collapsed_ids: &HashSet<String>) -> Vec<FlatDoneTask<'a>> {
    let mut result = Vec::new();
    push_done(tree, collapsed_ids, 0, &mut result);
    result
}

fn push_done<'a>(
    tree: &[DoneViewItem<'a>],
    collapsed_ids: &HashSet<String>,
    depth: usize,
    result: &mut Vec<FlatDoneTask<'a>>,
) {
    for item in tree {
        result.push(FlatDoneTask {
            entry: FlatTask {
                task: item.task,
                depth,
            },
            is_done_leaf: item.is_done_leaf,
        });
        if !item.children.is_empty() && !collapsed_ids.contains(&item.task.id) {
            push_done(&item.children, collapsed_ids, depth + 1, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task(id: &str, parent: Option<&str>, children: Vec<Task>) -> Task {
        let mut task = Task::new(id, id);
        task.parent_id = parent.map(ToOwned::to_owned);
        task.subtasks = children;
        task
    }

    /// a
    ///   a1
    ///     a1x
    ///   a2
    /// b
    fn sample_forest() -> Vec<Task> {
        vec![
            task(
                "a",
                None,
                vec![
                    task("a1", Some("a"), vec![task("a1x", Some("a1"), vec![])]),
                    task("a2", Some("a"), vec![]),
                ],
            ),
            task("b", None, vec![]),
        ]
    }

    fn ids(entries: &[FlatTask<'_>]) -> Vec<String> {
        entries.iter().map(|entry| entry.task.id.clone()).collect()
    }

    fn preview_ids(entries: &[PreviewEntry<'_>]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                PreviewEntry::Real(real) => real.task.id.clone(),
                PreviewEntry::Ghost { depth, .. } => format!("ghost@{depth}"),
            })
            .collect()
    }

    fn list_over(list_id: &str, item_id: Option<&str>, placement: Placement, depth: usize) -> DragOver {
        DragOver::List(ListOver {
            list_id: list_id.to_string(),
            item_id: item_id.map(ToOwned::to_owned),
            placement,
            depth,
        })
    }

    #[test]
    fn flatten_walks_pre_order_with_depths() {
        let forest = sample_forest();
        let flat = flatten(&forest);

        assert_eq!(ids(&flat), vec!["a", "a1", "a1x", "a2", "b"]);
        assert_eq!(
            flat.iter().map(|entry| entry.depth).collect::<Vec<_>>(),
            vec![0, 1, 2, 1, 0]
        );
    }

    #[test]
    fn flatten_stops_at_collapsed_tasks() {
        let mut forest = sample_forest();
        forest[0].subtasks[0].is_collapsed = true;
        assert_eq!(ids(&flatten(&forest)), vec!["a", "a1", "a2", "b"]);
    }

    #[test]
    fn flatten_roots_walks_only_the_selected_roots() {
        let forest = sample_forest();
        let flat = flatten_roots(forest.iter().filter(|task| task.id == "b"));
        assert_eq!(ids(&flat), vec!["b"]);

        let flat = flatten_roots(forest.iter().rev());
        assert_eq!(ids(&flat), vec!["b", "a", "a1", "a1x", "a2"]);
        assert_eq!(flat[2].depth, 1);
    }

    #[test]
    fn flatten_visible_filters_entries_but_keeps_depth() {
        let mut forest = sample_forest();
        forest[0].subtasks[0].is_done = true;
        let flat = flatten_visible(&forest, |task| !task.is_done);

        assert_eq!(ids(&flat), vec!["a", "a1x", "a2", "b"]);
        assert_eq!(flat[1].depth, 2);
    }

    #[test]
    fn remove_subtree_drops_descendant_run() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let removed = remove_subtree(&flat, "a1");

        assert_eq!(ids(&removed.filtered), vec!["a", "a2", "b"]);
        assert_eq!(removed.original_index, Some(1));
        assert_eq!(removed.original_depth, 1);
    }

    #[test]
    fn remove_subtree_of_unknown_id_is_identity() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let removed = remove_subtree(&flat, "zzz");

        assert_eq!(removed.filtered, flat);
        assert_eq!(removed.original_index, None);
    }

    #[test]
    fn compute_flat_drop_index_follows_placement() {
        let forest = sample_forest();
        let flat = flatten(&forest);

        let before = list_over("inbox", Some("a2"), Placement::Before, 1);
        let after = list_over("inbox", Some("a2"), Placement::After, 1);
        let end = list_over("inbox", None, Placement::End, 0);
        let stale = list_over("inbox", Some("gone"), Placement::Before, 0);

        assert_eq!(compute_flat_drop_index(&flat, before.as_list().expect("list")), 3);
        assert_eq!(compute_flat_drop_index(&flat, after.as_list().expect("list")), 4);
        assert_eq!(compute_flat_drop_index(&flat, end.as_list().expect("list")), 5);
        assert_eq!(compute_flat_drop_index(&flat, stale.as_list().expect("list")), 5);
    }

    #[test]
    fn resolve_drop_parent_at_root_counts_preceding_roots() {
        let forest = sample_forest();
        let flat = flatten(&forest);

        assert_eq!(
            resolve_drop_parent(&flat, 4, 0),
            DropParent {
                parent_id: None,
                child_index: 1
            }
        );
    }

    #[test]
    fn resolve_drop_parent_finds_nearest_shallower_entry() {
        let forest = sample_forest();
        let flat = flatten(&forest);

        assert_eq!(
            resolve_drop_parent(&flat, 4, 1),
            DropParent {
                parent_id: Some("a".to_string()),
                child_index: 2
            }
        );
        assert_eq!(
            resolve_drop_parent(&flat, 3, 2),
            DropParent {
                parent_id: Some("a1".to_string()),
                child_index: 1
            }
        );
    }

    #[test]
    fn resolve_drop_parent_without_candidate_falls_back_to_root() {
        let forest = sample_forest();
        let flat = flatten(&forest);

        assert_eq!(
            resolve_drop_parent(&flat, 0, 1),
            DropParent {
                parent_id: None,
                child_index: 0
            }
        );
        assert_eq!(
            resolve_drop_parent(&flat, 5, 2),
            DropParent {
                parent_id: None,
                child_index: 0
            }
        );
    }

    #[test]
    fn preview_from_calendar_source_is_unchanged() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let payload = DragPayload::Task(forest[1].clone());
        let source = DragSource::Calendar { date: None };
        let over = list_over("inbox", Some("a"), Placement::Before, 0);
        let ctx = PreviewContext {
            active_id: Some("b"),
            payload: Some(&payload),
            over: Some(&over),
            dragging: true,
            source: Some(&source),
        };

        assert_eq!(preview_ids(&build_preview(&flat, "inbox", &ctx)), ids(&flat));
    }

    #[test]
    fn preview_inserts_ghost_at_target_in_this_list() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let payload = DragPayload::Task(forest[1].clone());
        let source = DragSource::list("inbox");
        let over = list_over("inbox", Some("a1"), Placement::Before, 1);
        let ctx = PreviewContext {
            active_id: Some("b"),
            payload: Some(&payload),
            over: Some(&over),
            dragging: true,
            source: Some(&source),
        };

        assert_eq!(
            preview_ids(&build_preview(&flat, "inbox", &ctx)),
            vec!["a", "ghost@1", "a1", "a1x", "a2"]
        );
    }

    #[test]
    fn preview_keeps_ghost_at_origin_while_hovering_elsewhere() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let payload = DragPayload::Task(forest[0].subtasks[0].clone());
        let source = DragSource::list("inbox");
        let over = DragOver::Calendar(crate::domain::drop_target::CalendarOver {
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 16).expect("date"),
            minutes: 600,
        });
        let ctx = PreviewContext {
            active_id: Some("a1"),
            payload: Some(&payload),
            over: Some(&over),
            dragging: true,
            source: Some(&source),
        };

        assert_eq!(
            preview_ids(&build_preview(&flat, "inbox", &ctx)),
            vec!["a", "ghost@1", "a2", "b"]
        );

        let no_target = PreviewContext { over: None, ..ctx };
        assert_eq!(
            preview_ids(&build_preview(&flat, "inbox", &no_target)),
            vec!["a", "ghost@1", "a2", "b"]
        );
    }

    #[test]
    fn preview_of_other_list_drops_ghost_when_target_is_elsewhere() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let payload = DragPayload::Task(forest[1].clone());
        let source = DragSource::list("todo");
        let over = list_over("in_progress", None, Placement::End, 0);
        let ctx = PreviewContext {
            active_id: Some("x"),
            payload: Some(&payload),
            over: Some(&over),
            dragging: true,
            source: Some(&source),
        };

        assert_eq!(preview_ids(&build_preview(&flat, "inbox", &ctx)), ids(&flat));
    }

    #[test]
    fn preview_before_threshold_only_hides_the_dragged_subtree() {
        let forest = sample_forest();
        let flat = flatten(&forest);
        let payload = DragPayload::Task(forest[0].clone());
        let source = DragSource::list("inbox");
        let ctx = PreviewContext {
            active_id: Some("a"),
            payload: Some(&payload),
            over: None,
            dragging: false,
            source: Some(&source),
        };

        assert_eq!(preview_ids(&build_preview(&flat, "inbox", &ctx)), vec!["b"]);
        assert_eq!(
            preview_ids(&build_preview(&flat, "inbox", &PreviewContext::idle())),
            ids(&flat)
        );
    }

    #[test]
    fn preview_into_empty_list_appends_ghost() {
        let payload = DragPayload::Task(Task::new("t", "t"));
        let source = DragSource::list("inbox");
        let over = list_over("todo", None, Placement::End, 0);
        let ctx = PreviewContext {
            active_id: Some("t"),
            payload: Some(&payload),
            over: Some(&over),
            dragging: true,
            source: Some(&source),
        };

        let preview = build_preview(&[], "todo", &ctx);
        assert_eq!(preview.len(), 1);
        assert!(preview[0].is_ghost());
        assert_eq!(preview[0].task().id, "t");
    }

    #[test]
    fn depth_from_x_clamps_between_neighbors() {
        let geometry = IndentGeometry::default();
        let list_left = 0.0;

        // after an item at depth 1, next real item at depth 0
        assert_eq!(compute_depth_from_x(16.0 + 24.0 * 5.0, list_left, Placement::After, 1, Some(0), geometry), 2);
        assert_eq!(compute_depth_from_x(-100.0, list_left, Placement::After, 1, Some(0), geometry), 0);
        assert_eq!(compute_depth_from_x(16.0 + 30.0, list_left, Placement::After, 1, Some(0), geometry), 1);

        // before the first item: nothing above, so at most depth 0
        assert_eq!(compute_depth_from_x(500.0, list_left, Placement::Before, 0, None, geometry), 0);

        // next item is deeper than the row above allows: max wins
        assert_eq!(compute_depth_from_x(0.0, list_left, Placement::After, 0, Some(3), geometry), 1);
    }

    #[test]
    fn map_filtered_index_skips_hidden_siblings() {
        let mut siblings = vec![
            Task::new("a", "a"),
            Task::new("b", "b"),
            Task::new("c", "c"),
        ];
        siblings[0].is_done = true;
        let visible = |task: &Task| !task.is_done;

        assert_eq!(map_filtered_index(&siblings, 0, visible), 1);
        assert_eq!(map_filtered_index(&siblings, 1, visible), 2);
        assert_eq!(map_filtered_index(&siblings, 2, visible), 3);
    }

    #[test]
    fn done_tree_keeps_done_items_and_their_ancestors() {
        let mut forest = sample_forest();
        forest[0].subtasks[0].subtasks[0].is_done = true;
        forest[1].is_done = true;
        forest[1].is_archived = true;

        let tree = done_tree(&forest);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].task.id, "a");
        assert!(!tree[0].is_done_leaf);

        let flat = flatten_done_tree(&tree, &HashSet::new());
        let flat_ids: Vec<_> = flat.iter().map(|item| item.entry.task.id.as_str()).collect();
        assert_eq!(flat_ids, vec!["a", "a1", "a1x"]);
        assert!(flat[2].is_done_leaf);

        let collapsed = HashSet::from(["a1".to_string()]);
        assert_eq!(flatten_done_tree(&tree, &collapsed).len(), 2);
    }

    #[derive(Debug, Clone)]
    struct Shape {
        collapsed: bool,
        children: Vec<Shape>,
    }

    fn shape() -> impl Strategy<Value = Shape> {
        let leaf = any::<bool>().prop_map(|collapsed| Shape {
            collapsed,
            children: Vec::new(),
        });
        leaf.prop_recursive(3, 24, 4, |inner| {
            (any::<bool>(), prop::collection::vec(inner, 0..4))
                .prop_map(|(collapsed, children)| Shape { collapsed, children })
        })
    }

    fn build(shape: &Shape, parent: Option<&str>, counter: &mut usize) -> Task {
        *counter += 1;
        let id = format!("t{counter}");
        let mut node = task(&id, parent, Vec::new());
        node.is_collapsed = shape.collapsed;
        node.subtasks = shape
            .children
            .iter()
            .map(|child| build(child, Some(&id), counter))
            .collect();
        node
    }

    fn forest() -> impl Strategy<Value = Vec<Task>> {
        prop::collection::vec(shape(), 0..5).prop_map(|shapes| {
            let mut counter = 0;
            shapes.iter().map(|shape| build(shape, None, &mut counter)).collect()
        })
    }

    fn expand_all(tasks: &mut [Task]) {
        for task in tasks {
            task.is_collapsed = false;
            expand_all(&mut task.subtasks);
        }
    }

    // Feature: timeblocks, Property 5: removing a subtree removes exactly its contiguous run
    proptest! {
        #[test]
        fn property5_remove_subtree_removes_task_and_all_descendants(mut tasks in forest(), pick in any::<prop::sample::Index>()) {
            expand_all(&mut tasks);
            let flat = flatten(&tasks);
            prop_assume!(!flat.is_empty());
            let index = pick.index(flat.len());
            let target = flat[index].task;

            let removed = remove_subtree(&flat, &target.id);
            let run = 1 + target.descendant_count();

            prop_assert_eq!(removed.filtered.len(), flat.len() - run);
            prop_assert_eq!(&removed.filtered[..index], &flat[..index]);
            prop_assert_eq!(&removed.filtered[index..], &flat[index + run..]);
        }
    }

    // Feature: timeblocks, Property 6: a collapsed task contributes exactly one entry
    proptest! {
        #[test]
        fn property6_collapse_hides_only_that_subtree(mut tasks in forest(), pick in any::<prop::sample::Index>()) {
            expand_all(&mut tasks);
            let expanded_ids = ids(&flatten(&tasks));
            prop_assume!(!expanded_ids.is_empty());
            let target_id = expanded_ids[pick.index(expanded_ids.len())].clone();

            fn collapse(tasks: &mut [Task], id: &str) {
                for task in tasks {
                    if task.id == id {
                        task.is_collapsed = true;
                        return;
                    }
                    collapse(&mut task.subtasks, id);
                }
            }
            let mut collapsed = tasks.clone();
            collapse(&mut collapsed, &target_id);

            let expanded_flat = flatten(&tasks);
            let expected = ids(&remove_subtree(&expanded_flat, &target_id).filtered);
            let collapsed_ids = ids(&flatten(&collapsed));
            let position = collapsed_ids.iter().position(|id| *id == target_id).expect("collapsed task stays visible");

            let mut without_target = collapsed_ids.clone();
            without_target.remove(position);
            prop_assert_eq!(without_target, expected);
        }
    }
}
