use crate::domain::drop_target::{CalendarOver, DragOver, DragSource, ListOver, Placement};
use crate::domain::flat_list::{IndentGeometry, PreviewContext, compute_depth_from_x};
use crate::domain::models::DragPayload;
use crate::domain::time_grid::{Point, Rect, Size, autoscroll_velocity, minutes_from_offset};
use crate::infrastructure::config::DragConfig;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Opaque handle of a mounted element. Handles grow with mount order, which doubles as paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

/// What an element means to hit-testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRole {
    Plain,
    /// Sub-control inside a draggable that must not start a drag.
    NoDrag,
    Item {
        list_id: String,
        item_id: String,
        depth: usize,
        preview: bool,
    },
    List {
        list_id: String,
    },
    /// Container of several lists, e.g. the board.
    ListRegion,
    CalendarDay {
        date: NaiveDate,
    },
    CalendarZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollState {
    pub left: f64,
    pub top: f64,
    pub max_left: f64,
    pub max_top: f64,
}

#[derive(Debug, Clone)]
struct Element {
    role: ElementRole,
    rect: Rect,
    parent: Option<ElementId>,
    scroll: Option<ScrollState>,
}

#[derive(Debug, Clone)]
pub struct DraggableConfig<D> {
    pub id: String,
    pub payload: D,
    pub source: Option<DragSource>,
    /// Element whose rect defines the grab offset and overlay size. Defaults to the draggable.
    pub grab_element: Option<ElementId>,
}

/// Everything a drop handler learns about the finished drag.
#[derive(Debug, Clone)]
pub struct DropInfo<D> {
    pub over: Option<DragOver>,
    pub payload: D,
    pub source: Option<DragSource>,
    pub overlay: Option<Rect>,
}

pub type DropHandler<D, C> = Box<dyn FnMut(&mut C, &str, &DropInfo<D>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: i64,
    pub button: PointerButton,
    pub position: Point,
}

/// Live state of a drag past the threshold.
#[derive(Debug, Clone)]
pub struct DragSession<D> {
    pub active_id: String,
    pub payload: D,
    pub source: Option<DragSource>,
    pub offset: Point,
    pub size: Size,
    pub position: Point,
    pub over: Option<DragOver>,
}

impl<D> DragSession<D> {
    /// Where the floating card is drawn: pointer minus grab offset.
    pub fn overlay_rect(&self) -> Rect {
        Rect::new(
            self.position.x - self.offset.x,
            self.position.y - self.offset.y,
            self.size.width,
            self.size.height,
        )
    }
}

#[derive(Debug, Clone)]
struct PendingDrag<D> {
    id: String,
    payload: D,
    source: Option<DragSource>,
    offset: Point,
    size: Size,
    start: Point,
}

#[derive(Debug, Clone)]
enum Phase<D> {
    Idle,
    Pending(PendingDrag<D>),
    Dragging(DragSession<D>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome<D> {
    /// Not the tracked pointer.
    Ignored,
    /// Released before the drag threshold.
    Clicked { id: String },
    Dropped {
        id: String,
        target: ElementId,
        over: Option<DragOver>,
        payload: D,
        source: Option<DragSource>,
        overlay: Option<Rect>,
    },
    /// No handler took the drop. `overlay` is set for list sources, which animate back.
    Cancelled {
        id: String,
        payload: D,
        overlay: Option<Rect>,
    },
}

#[derive(Debug, Clone, Default)]
struct Resolution {
    over: Option<DragOver>,
    drop_element: Option<ElementId>,
}

/// Pointer-driven drag and drop over a registry of mounted elements.
///
/// `D` is the payload carried by draggables and `C` the context handed to drop handlers.
pub struct DragEngine<D, C> {
    config: DragConfig,
    elements: BTreeMap<ElementId, Element>,
    draggables: HashMap<ElementId, DraggableConfig<D>>,
    droppables: HashMap<ElementId, Option<DropHandler<D, C>>>,
    next_element: u64,
    phase: Phase<D>,
    pointer_id: Option<i64>,
    active_drop: Option<ElementId>,
    frame_pending: bool,
    resizing: bool,
}

impl<D: Clone, C> DragEngine<D, C> {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            elements: BTreeMap::new(),
            draggables: HashMap::new(),
            droppables: HashMap::new(),
            next_element: 0,
            phase: Phase::Idle,
            pointer_id: None,
            active_drop: None,
            frame_pending: false,
            resizing: false,
        }
    }

    pub fn mount(&mut self, parent: Option<ElementId>, role: ElementRole, rect: Rect) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        self.elements.insert(
            id,
            Element {
                role,
                rect,
                parent,
                scroll: None,
            },
        );
        id
    }

    /// Removes the element, its descendants and their registrations.
    pub fn unmount(&mut self, id: ElementId) {
        let doomed: Vec<ElementId> = self
            .elements
            .keys()
            .copied()
            .filter(|candidate| self.is_within(*candidate, id))
            .collect();
        for element in doomed {
            self.elements.remove(&element);
            self.draggables.remove(&element);
            self.droppables.remove(&element);
            if self.active_drop == Some(element) {
                self.active_drop = None;
            }
        }
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.rect = rect;
        }
    }

    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.elements.get(&id).map(|element| element.rect)
    }

    /// Rect of the rendered (non-preview) card for `item_id`.
    pub fn item_rect(&self, item_id: &str) -> Option<Rect> {
        self.elements
            .values()
            .find(|element| match &element.role {
                ElementRole::Item {
                    item_id: candidate,
                    preview: false,
                    ..
                } => candidate == item_id,
                _ => false,
            })
            .map(|element| element.rect)
    }

    pub fn set_scroll(&mut self, id: ElementId, scroll: ScrollState) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.scroll = Some(scroll);
        }
    }

    pub fn scroll_state(&self, id: ElementId) -> Option<ScrollState> {
        self.elements.get(&id).and_then(|element| element.scroll)
    }

    pub fn register_draggable(&mut self, id: ElementId, config: DraggableConfig<D>) {
        if self.elements.contains_key(&id) {
            self.draggables.insert(id, config);
        }
    }

    pub fn unregister_draggable(&mut self, id: ElementId) {
        self.draggables.remove(&id);
    }

    /// Registers a list or calendar-day element as a drop target. A target without a handler
    /// still resolves but never accepts the drop.
    pub fn register_droppable(&mut self, id: ElementId, on_drop: Option<DropHandler<D, C>>) {
        if self.elements.contains_key(&id) {
            self.droppables.insert(id, on_drop);
        }
    }

    pub fn unregister_droppable(&mut self, id: ElementId) {
        self.droppables.remove(&id);
    }

    pub fn set_resizing(&mut self, resizing: bool) {
        self.resizing = resizing;
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending(_))
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession<D>> {
        match &self.phase {
            Phase::Dragging(session) => Some(session),
            _ => None,
        }
    }

    pub fn drag_over(&self) -> Option<&DragOver> {
        self.session().and_then(|session| session.over.as_ref())
    }

    pub fn overlay_rect(&self) -> Option<Rect> {
        self.session().map(DragSession::overlay_rect)
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        if self.resizing || event.button != PointerButton::Primary || self.pointer_id.is_some() {
            return false;
        }
        let Some(target) = self.element_from_point(event.position) else {
            return false;
        };
        if self
            .closest(target, |element| element.role == ElementRole::NoDrag)
            .is_some()
        {
            return false;
        }
        let Some(handle) = self.closest_by_id(target, |id| self.draggables.contains_key(&id)) else {
            return false;
        };
        let Some(config) = self.draggables.get(&handle) else {
            return false;
        };

        let grab_rect = config
            .grab_element
            .and_then(|id| self.rect(id))
            .or_else(|| self.rect(handle))
            .unwrap_or_default();
        self.phase = Phase::Pending(PendingDrag {
            id: config.id.clone(),
            payload: config.payload.clone(),
            source: config.source.clone(),
            offset: Point::new(
                event.position.x - grab_rect.left,
                event.position.y - grab_rect.top,
            ),
            size: grab_rect.size(),
            start: event.position,
        });
        self.pointer_id = Some(event.pointer_id);
        true
    }

    /// Updates position; the hit test waits for the next `animation_frame`.
    pub fn pointer_move(&mut self, pointer_id: i64, position: Point) {
        if self.pointer_id != Some(pointer_id) {
            return;
        }
        let threshold = self.config.threshold_px;
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match phase {
            Phase::Pending(pending) if pending.start.distance_to(position) >= threshold => {
                info!(drag_id = %pending.id, "drag started");
                self.frame_pending = true;
                Phase::Dragging(DragSession {
                    active_id: pending.id,
                    payload: pending.payload,
                    source: pending.source,
                    offset: pending.offset,
                    size: pending.size,
                    position,
                    over: None,
                })
            }
            Phase::Dragging(mut session) => {
                session.position = position;
                self.frame_pending = true;
                Phase::Dragging(session)
            }
            other => other,
        };
    }

    /// One frame: hit-test if the pointer moved, then autoscroll the calendar for calendar drags.
    pub fn animation_frame(&mut self) {
        let Phase::Dragging(session) = &self.phase else {
            self.frame_pending = false;
            return;
        };
        let position = session.position;
        let offset = session.offset;
        let from_calendar = session.source.as_ref().is_some_and(DragSource::is_calendar);

        if self.frame_pending {
            self.frame_pending = false;
            let resolution = self.resolve_drop_target(position, from_calendar, offset);
            self.apply(resolution);
        }
        if from_calendar {
            self.autoscroll(position, offset);
        }
    }

    pub fn pointer_up(&mut self, pointer_id: i64, position: Point, context: &mut C) -> ReleaseOutcome<D> {
        if self.pointer_id != Some(pointer_id) {
            return ReleaseOutcome::Ignored;
        }
        self.pointer_move(pointer_id, position);
        if self.frame_pending && self.is_dragging() {
            self.frame_pending = false;
            if let Phase::Dragging(session) = &self.phase {
                let from_calendar = session.source.as_ref().is_some_and(DragSource::is_calendar);
                let resolution = self.resolve_drop_target(session.position, from_calendar, session.offset);
                self.apply(resolution);
            }
        }

        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let target = self.active_drop.take();
        self.pointer_id = None;
        self.frame_pending = false;

        let session = match phase {
            Phase::Idle => return ReleaseOutcome::Ignored,
            Phase::Pending(pending) => return ReleaseOutcome::Clicked { id: pending.id },
            Phase::Dragging(session) => session,
        };

        let overlay = Some(session.overlay_rect());
        let info = DropInfo {
            over: session.over.clone(),
            payload: session.payload.clone(),
            source: session.source.clone(),
            overlay,
        };
        let handler = target.and_then(|target| {
            self.droppables
                .get_mut(&target)
                .and_then(Option::as_mut)
                .map(|handler| (target, handler))
        });
        if let Some((target, handler)) = handler {
            handler(context, &session.active_id, &info);
            info!(drag_id = %session.active_id, "drop committed");
            return ReleaseOutcome::Dropped {
                id: session.active_id,
                target,
                over: info.over,
                payload: session.payload,
                source: session.source,
                overlay,
            };
        }

        debug!(drag_id = %session.active_id, "drag cancelled");
        let from_list = matches!(session.source, Some(DragSource::List { .. }));
        ReleaseOutcome::Cancelled {
            id: session.active_id,
            payload: session.payload,
            overlay: overlay.filter(|_| from_list),
        }
    }

    /// Abandons the drag without dropping.
    pub fn pointer_cancel(&mut self, pointer_id: i64) -> bool {
        if self.pointer_id != Some(pointer_id) {
            return false;
        }
        if let Phase::Dragging(session) = &self.phase {
            debug!(drag_id = %session.active_id, "drag abandoned");
        }
        self.phase = Phase::Idle;
        self.pointer_id = None;
        self.active_drop = None;
        self.frame_pending = false;
        true
    }

    fn apply(&mut self, resolution: Resolution) {
        if let Phase::Dragging(session) = &mut self.phase {
            session.over = resolution.over;
        }
        self.active_drop = resolution.drop_element;
    }

    fn element_from_point(&self, point: Point) -> Option<ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|(_, element)| element.rect.contains(point))
            .map(|(id, _)| *id)
    }

    fn closest(&self, start: ElementId, predicate: impl Fn(&Element) -> bool) -> Option<ElementId> {
        self.closest_by_id(start, |id| self.elements.get(&id).is_some_and(&predicate))
    }

    fn closest_by_id(&self, start: ElementId, predicate: impl Fn(ElementId) -> bool) -> Option<ElementId> {
        let mut current = Some(start);
        while let Some(id) = current {
            if predicate(id) {
                return Some(id);
            }
            current = self.elements.get(&id).and_then(|element| element.parent);
        }
        None
    }

    fn is_within(&self, id: ElementId, ancestor: ElementId) -> bool {
        self.closest_by_id(id, |candidate| candidate == ancestor).is_some()
    }

    fn resolve_drop_target(&self, position: Point, from_calendar: bool, offset: Point) -> Resolution {
        let hit = self.element_from_point(position);

        if from_calendar {
            return hit
                .and_then(|hit| self.closest(hit, is_calendar_day))
                .and_then(|day| self.calendar_over(day, position, offset.y, false))
                .or_else(|| {
                    self.first_zone()
                        .and_then(|zone| self.nearest_day(zone, position.x))
                        .and_then(|day| self.calendar_over(day, position, offset.y, true))
                })
                .unwrap_or_default();
        }

        let Some(hit) = hit else {
            return Resolution::default();
        };

        let resolved = self
            .closest(hit, |element| matches!(element.role, ElementRole::Item { preview: false, .. }))
            .and_then(|item| self.item_over(item, position, offset))
            .or_else(|| {
                self.closest(hit, is_list)
                    .and_then(|list| self.list_over(list, position, offset))
            })
            .or_else(|| {
                self.closest(hit, is_calendar_day)
                    .and_then(|day| self.calendar_over(day, position, offset.y, false))
            });
        if let Some(resolution) = resolved {
            return resolution;
        }

        if self.closest(hit, |element| element.role == ElementRole::CalendarZone).is_some() {
            return Resolution::default();
        }

        self.closest(hit, |element| element.role == ElementRole::ListRegion)
            .and_then(|region| self.nearest_list_in(region, position.x))
            .and_then(|list| self.list_over(list, position, offset))
            .unwrap_or_default()
    }

    fn nearest_list_in(&self, region: ElementId, x: f64) -> Option<ElementId> {
        self.droppables
            .keys()
            .copied()
            .filter(|id| self.elements.get(id).is_some_and(is_list) && self.is_within(*id, region))
            .filter_map(|id| self.rect(id).map(|rect| (id, (x - rect.center_x()).abs())))
            .min_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then(a_id.cmp(b_id)))
            .map(|(id, _)| id)
    }

    fn calendar_over(&self, day: ElementId, position: Point, grab_y: f64, clamp_y: bool) -> Option<Resolution> {
        let element = self.elements.get(&day)?;
        let ElementRole::CalendarDay { date } = element.role else {
            return None;
        };
        let raw_offset = position.y - element.rect.top;
        let y_offset = if clamp_y {
            raw_offset.clamp(0.0, element.rect.height.max(0.0))
        } else {
            raw_offset
        };
        let minutes = minutes_from_offset(
            y_offset,
            grab_y,
            self.config.pixels_per_minute,
            self.config.round_minutes,
        );
        Some(Resolution {
            over: Some(DragOver::Calendar(CalendarOver { date, minutes })),
            drop_element: Some(day),
        })
    }

    fn item_over(&self, item: ElementId, position: Point, offset: Point) -> Option<Resolution> {
        let element = self.elements.get(&item)?;
        let ElementRole::Item {
            list_id, item_id, ..
        } = &element.role
        else {
            return None;
        };
        let placement = placement_for(element.rect, position.y);
        let list = self.closest(item, is_list);
        let depth = list.map_or(0, |list| self.depth_at(list, item, placement, position.x - offset.x));
        Some(Resolution {
            over: Some(DragOver::List(ListOver {
                list_id: list_id.clone(),
                item_id: Some(item_id.clone()),
                placement,
                depth,
            })),
            drop_element: list,
        })
    }

    /// Targets the vertically nearest real item of the list, or its end when empty.
    fn list_over(&self, list: ElementId, position: Point, offset: Point) -> Option<Resolution> {
        let ElementRole::List { list_id } = &self.elements.get(&list)?.role else {
            return None;
        };

        let mut nearest: Option<(ElementId, f64)> = None;
        for (id, element) in &self.elements {
            let ElementRole::Item {
                list_id: item_list,
                preview: false,
                ..
            } = &element.role
            else {
                continue;
            };
            if item_list != list_id || !self.is_within(*id, list) {
                continue;
            }
            let distance = (position.y - element.rect.center_y()).abs();
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((*id, distance));
            }
        }

        let over = match nearest {
            Some((item, _)) => {
                let element = self.elements.get(&item)?;
                let ElementRole::Item { item_id, .. } = &element.role else {
                    return None;
                };
                let placement = placement_for(element.rect, position.y);
                ListOver {
                    list_id: list_id.clone(),
                    item_id: Some(item_id.clone()),
                    placement,
                    depth: self.depth_at(list, item, placement, position.x - offset.x),
                }
            }
            None => ListOver {
                list_id: list_id.clone(),
                item_id: None,
                placement: Placement::End,
                depth: 0,
            },
        };
        Some(Resolution {
            over: Some(DragOver::List(over)),
            drop_element: Some(list),
        })
    }

    fn depth_at(&self, list: ElementId, item: ElementId, placement: Placement, card_left_x: f64) -> usize {
        let list_left = self.rect(list).map_or(0.0, |rect| rect.left);
        let item_depth = self.item_depth(item).unwrap_or(0);
        compute_depth_from_x(
            card_left_x,
            list_left,
            placement,
            item_depth,
            self.neighbor_depth(item, placement),
            IndentGeometry {
                indent_px: self.config.indent_px,
                list_padding_px: self.config.list_padding_px,
            },
        )
    }

    fn item_depth(&self, item: ElementId) -> Option<usize> {
        match self.elements.get(&item)?.role {
            ElementRole::Item { depth, .. } => Some(depth),
            _ => None,
        }
    }

    /// Depth of the next real sibling item for `After`, the previous one for `Before`.
    fn neighbor_depth(&self, item: ElementId, placement: Placement) -> Option<usize> {
        let parent = self.elements.get(&item)?.parent;
        let siblings: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|(_, element)| {
                element.parent == parent && matches!(element.role, ElementRole::Item { preview: false, .. })
            })
            .map(|(id, _)| *id)
            .collect();
        let position = siblings.iter().position(|candidate| *candidate == item)?;
        let neighbor = match placement {
            Placement::Before => position.checked_sub(1).map(|index| siblings[index]),
            Placement::After | Placement::End => siblings.get(position + 1).copied(),
        }?;
        self.item_depth(neighbor)
    }

    fn first_zone(&self) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|(_, element)| element.role == ElementRole::CalendarZone)
            .map(|(id, _)| *id)
    }

    fn nearest_day(&self, zone: ElementId, x: f64) -> Option<ElementId> {
        let mut nearest: Option<(ElementId, f64)> = None;
        for (id, element) in &self.elements {
            if !is_calendar_day(element) || !self.is_within(*id, zone) {
                continue;
            }
            let distance = element.rect.horizontal_distance(x);
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((*id, distance));
            }
        }
        nearest.map(|(id, _)| id)
    }

    fn autoscroll(&mut self, position: Point, offset: Point) {
        let Some(zone) = self
            .elements
            .iter()
            .find(|(_, element)| element.role == ElementRole::CalendarZone && element.scroll.is_some())
            .map(|(id, _)| *id)
        else {
            return;
        };
        let Some(bounds) = self.rect(zone) else {
            return;
        };
        let (dx, dy) = autoscroll_velocity(
            position,
            bounds,
            self.config.autoscroll_edge_px,
            self.config.autoscroll_max_speed,
        );
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        self.scroll_by(zone, dx, dy);
        if let Some(resolution) = self
            .nearest_day(zone, position.x)
            .and_then(|day| self.calendar_over(day, position, offset.y, true))
        {
            self.apply(resolution);
        }
    }

    /// Scrolls within bounds and shifts every descendant by the applied amount.
    fn scroll_by(&mut self, zone: ElementId, dx: f64, dy: f64) {
        let Some(scroll) = self.scroll_state(zone) else {
            return;
        };
        let left = (scroll.left + dx).min(scroll.max_left).max(0.0);
        let top = (scroll.top + dy).min(scroll.max_top).max(0.0);
        let (applied_x, applied_y) = (left - scroll.left, top - scroll.top);
        self.set_scroll(zone, ScrollState { left, top, ..scroll });
        if applied_x == 0.0 && applied_y == 0.0 {
            return;
        }

        let descendants: Vec<ElementId> = self
            .elements
            .keys()
            .copied()
            .filter(|id| *id != zone && self.is_within(*id, zone))
            .collect();
        for id in descendants {
            if let Some(element) = self.elements.get_mut(&id) {
                element.rect = element.rect.translated(-applied_x, -applied_y);
            }
        }
    }
}

impl<C> DragEngine<DragPayload, C> {
    /// Drag snapshot for the preview builders.
    pub fn preview_context(&self) -> PreviewContext<'_> {
        match self.session() {
            Some(session) => PreviewContext {
                active_id: Some(&session.active_id),
                payload: Some(&session.payload),
                over: session.over.as_ref(),
                dragging: true,
                source: session.source.as_ref(),
            },
            None => PreviewContext::idle(),
        }
    }
}

fn is_list(element: &Element) -> bool {
    matches!(element.role, ElementRole::List { .. })
}

fn is_calendar_day(element: &Element) -> bool {
    matches!(element.role, ElementRole::CalendarDay { .. })
}

fn placement_for(rect: Rect, y: f64) -> Placement {
    if y < rect.center_y() {
        Placement::Before
    } else {
        Placement::After
    }
}
