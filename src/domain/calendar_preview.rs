use crate::domain::flat_list::PreviewContext;
use crate::domain::models::{CalendarSlot, DragPayload, SlotType};
use crate::domain::schedule::{ScheduleItem, resolve_schedule};
use crate::domain::time_grid::{MAX_BLOCK_MINUTES, clamp_minutes, instant_at_minutes, minutes_in_day, round_to_step};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Side a block yields to when internal and external blocks overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapSide {
    Left,
    Right,
}

/// In-flight resize of one block, shown before it is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePreview {
    pub slot_id: String,
    pub date: NaiveDate,
    pub duration: u32,
    pub start_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSlot {
    pub slot: CalendarSlot,
    pub is_ghost: bool,
    pub display_start: DateTime<Utc>,
    pub display_duration: u32,
    pub overlap: Option<OverlapSide>,
}

impl PreviewSlot {
    fn from_slot(slot: &CalendarSlot) -> Self {
        Self {
            display_start: slot.start,
            display_duration: slot.duration,
            slot: slot.clone(),
            is_ghost: false,
            overlap: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.slot.slot_type == SlotType::External
    }

    pub fn display_minutes(&self, tz: Tz) -> i32 {
        minutes_in_day(self.display_start, tz)
    }
}

/// Blocks to render in the day column for `date`, including a drag ghost and resize preview.
///
/// Internal blocks are re-laid out around the ghost or the resized block; external events never
/// move. The result carries overlap marks. `default_duration` sizes a task ghost and any block
/// stored without a length.
pub fn build_calendar_preview(
    day_slots: &[CalendarSlot],
    date: NaiveDate,
    tz: Tz,
    ctx: &PreviewContext<'_>,
    resize: Option<&ResizePreview>,
    step: i32,
    default_duration: u32,
) -> Vec<PreviewSlot> {
    let over_calendar = ctx.over.and_then(|over| over.as_calendar());
    let hide_dragged = ctx.dragging
        && ctx.source.is_some_and(|source| source.is_calendar())
        && over_calendar.is_some();

    let mut base: Vec<PreviewSlot> = day_slots
        .iter()
        .filter(|slot| !(hide_dragged && ctx.active_id == Some(slot.id.as_str())))
        .map(PreviewSlot::from_slot)
        .collect();

    let mut pinned: Option<usize> = None;

    let resize_target = resize
        .filter(|resize| !ctx.dragging && resize.date == date)
        .and_then(|resize| {
            base.iter()
                .position(|entry| entry.slot.id == resize.slot_id)
                .map(|index| (resize, index))
        });
    if let Some((resize, index)) = resize_target {
        let entry = &mut base[index];
        entry.display_duration = resize.duration;
        if let Some(start_minutes) = resize.start_minutes {
            entry.display_start = instant_at_minutes(date, start_minutes, tz);
        }
        pinned = Some(index);
    }

    let ghost_target = ctx
        .payload
        .filter(|_| ctx.dragging)
        .zip(over_calendar.filter(|over| over.date == date));
    if let Some((payload, over)) = ghost_target {
        let minutes = clamp_minutes(round_to_step(f64::from(over.minutes), step));
        let start = instant_at_minutes(date, minutes, tz);
        let ghost = ghost_slot(payload, ctx.active_id, start, default_duration);
        base.push(PreviewSlot {
            display_start: start,
            display_duration: ghost.duration,
            slot: ghost,
            is_ghost: true,
            overlap: None,
        });
        pinned = Some(base.len() - 1);
    }

    if let Some(pinned) = pinned {
        relayout(&mut base, pinned, date, tz, default_duration);
        base.sort_by_key(|entry| entry.display_start);
    }

    mark_overlaps(&mut base, tz);
    base
}

fn ghost_slot(payload: &DragPayload, active_id: Option<&str>, start: DateTime<Utc>, default_duration: u32) -> CalendarSlot {
    match payload {
        DragPayload::Task(task) => CalendarSlot {
            id: active_id.unwrap_or(&task.id).to_string(),
            task_id: task.id.clone(),
            slot_type: SlotType::Task,
            title: task.title.clone(),
            category: task.category,
            start,
            duration: default_duration,
        },
        DragPayload::CalendarSlot(slot) => CalendarSlot {
            id: active_id.unwrap_or(&slot.id).to_string(),
            task_id: slot.task_id.clone(),
            slot_type: if slot.slot_type == SlotType::Draft {
                SlotType::Draft
            } else {
                SlotType::Task
            },
            title: slot.title.clone(),
            category: slot.category,
            start,
            duration: if slot.duration == 0 {
                default_duration
            } else {
                slot.duration
            },
        },
    }
}

/// Resolves internal blocks with `pinned` fixed. Schedule ids are positions so the ghost never
/// collides with a stored id.
fn relayout(base: &mut [PreviewSlot], pinned: usize, date: NaiveDate, tz: Tz, default_duration: u32) {
    let items: Vec<ScheduleItem> = base
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.is_external())
        .map(|(index, entry)| {
            let duration = if entry.display_duration == 0 {
                default_duration
            } else {
                entry.display_duration
            };
            ScheduleItem::new(
                index.to_string(),
                entry.display_minutes(tz),
                i32::try_from(duration.min(MAX_BLOCK_MINUTES)).unwrap_or(i32::MAX),
            )
        })
        .collect();

    let pinned_id = pinned.to_string();
    for item in resolve_schedule(&items, Some(&pinned_id)) {
        let Ok(index) = item.id.parse::<usize>() else {
            continue;
        };
        if let Some(entry) = base.get_mut(index) {
            entry.display_start = instant_at_minutes(date, item.start_minutes, tz);
        }
    }
}

/// Internal blocks that overlap an external event shift left; the external event shifts right.
pub fn mark_overlaps(slots: &mut [PreviewSlot], tz: Tz) {
    let spans: Vec<(i32, i32)> = slots
        .iter()
        .map(|entry| {
            let start = entry.display_minutes(tz);
            (start, start + entry.display_duration as i32)
        })
        .collect();

    for index in 0..slots.len() {
        let (start, end) = spans[index];
        let mut side = None;
        for (other_index, (other_start, other_end)) in spans.iter().copied().enumerate() {
            if other_index == index || slots[other_index].slot.id == slots[index].slot.id {
                continue;
            }
            if start < other_end && end > other_start {
                match (slots[index].is_external(), slots[other_index].is_external()) {
                    (true, false) => side = Some(OverlapSide::Right),
                    (false, true) => side = Some(OverlapSide::Left),
                    _ => {}
                }
            }
        }
        slots[index].overlap = side;
    }
}
