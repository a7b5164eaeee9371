use crate::domain::drop_target::DragSource;
use crate::domain::models::{DragPayload, Task};
use crate::domain::time_grid::Rect;
use tracing::debug;

pub const DROP_ANIMATION_DURATION_MS: u64 = 220;
pub const DROP_ANIMATION_EASING: CubicBezier = CubicBezier::new(0.2, 0.7, 0.2, 1.0);

/// CSS-style easing curve through (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Eased progress for linear progress `t` in 0..=1.
    pub fn ease(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let param = self.solve_x(t);
        bezier(param, self.y1, self.y2)
    }

    fn solve_x(&self, x: f64) -> f64 {
        let mut t = x;
        for _ in 0..8 {
            let error = bezier(t, self.x1, self.x2) - x;
            if error.abs() < 1e-6 {
                return t;
            }
            let slope = bezier_slope(t, self.x1, self.x2);
            if slope.abs() < 1e-6 {
                break;
            }
            t -= error / slope;
        }

        // Newton stalled: bisect.
        let (mut low, mut high) = (0.0, 1.0);
        t = x;
        for _ in 0..32 {
            let value = bezier(t, self.x1, self.x2);
            if (value - x).abs() < 1e-6 {
                break;
            }
            if value < x {
                low = t;
            } else {
                high = t;
            }
            t = (low + high) / 2.0;
        }
        t
    }
}

fn bezier(t: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - t;
    3.0 * inv * inv * t * p1 + 3.0 * inv * t * t * p2 + t * t * t
}

fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - t;
    3.0 * inv * inv * p1 + 6.0 * inv * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAnimationKind {
    List,
    Calendar,
    Cancel,
}

/// A floating card travelling from the release point to where the task landed.
#[derive(Debug, Clone, PartialEq)]
pub struct DropAnimation {
    pub task: Task,
    pub from: Rect,
    /// Unknown until the layout after the mutation has been measured.
    pub to: Option<Rect>,
    pub kind: DropAnimationKind,
}

impl DropAnimation {
    /// Rectangle at `elapsed_ms` into the animation, or `None` while the target is unmeasured.
    pub fn frame_at(&self, elapsed_ms: u64) -> Option<Rect> {
        let to = self.to?;
        let linear = (elapsed_ms as f64 / DROP_ANIMATION_DURATION_MS as f64).clamp(0.0, 1.0);
        let t = DROP_ANIMATION_EASING.ease(linear);
        Some(Rect::new(
            lerp(self.from.left, to.left, t),
            lerp(self.from.top, to.top, t),
            lerp(self.from.width, to.width, t),
            lerp(self.from.height, to.height, t),
        ))
    }

    pub fn is_finished(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= DROP_ANIMATION_DURATION_MS
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Holds at most one running drop animation.
#[derive(Debug, Clone, Default)]
pub struct DropAnimator {
    reduced_motion: bool,
    current: Option<DropAnimation>,
}

impl DropAnimator {
    pub fn new(reduced_motion: bool) -> Self {
        Self {
            reduced_motion,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&DropAnimation> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Starts a list drop before the mutation runs. Only task cards dragged out of a list animate.
    pub fn begin_list_drop(&mut self, payload: &DragPayload, source: Option<&DragSource>, from: Option<Rect>) -> bool {
        self.begin_from_list(DropAnimationKind::List, payload, source, from)
    }

    /// Starts a calendar drop. The card fades in place, so the target is the origin.
    pub fn begin_calendar_drop(
        &mut self,
        payload: &DragPayload,
        source: Option<&DragSource>,
        from: Option<Rect>,
    ) -> bool {
        if !self.begin_from_list(DropAnimationKind::Calendar, payload, source, from) {
            return false;
        }
        if let Some(animation) = self.current.as_mut() {
            animation.to = Some(animation.from);
        }
        true
    }

    pub fn begin_cancel(&mut self, task: &Task, from: Option<Rect>) -> bool {
        let Some(from) = from else {
            return false;
        };
        if self.reduced_motion {
            return false;
        }
        debug!(task_id = %task.id, "drop cancel animation");
        self.current = Some(DropAnimation {
            task: task.clone(),
            from,
            to: None,
            kind: DropAnimationKind::Cancel,
        });
        true
    }

    /// Supplies the measured rect of the landed card on the frame after the mutation.
    /// A missing rect drops the animation.
    pub fn settle(&mut self, landed: Option<Rect>) {
        let Some(animation) = self.current.as_mut() else {
            return;
        };
        if animation.to.is_some() {
            return;
        }
        match landed {
            Some(rect) => animation.to = Some(rect),
            None => self.current = None,
        }
    }

    fn begin_from_list(
        &mut self,
        kind: DropAnimationKind,
        payload: &DragPayload,
        source: Option<&DragSource>,
        from: Option<Rect>,
    ) -> bool {
        if !matches!(source, Some(DragSource::List { .. })) || self.reduced_motion {
            return false;
        }
        let (Some(task), Some(from)) = (payload.task(), from) else {
            return false;
        };
        debug!(task_id = %task.id, ?kind, "drop animation");
        self.current = Some(DropAnimation {
            task: task.clone(),
            from,
            to: None,
            kind,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_payload() -> DragPayload {
        DragPayload::Task(Task::new("t1", "Write report"))
    }

    fn from_rect() -> Rect {
        Rect::new(100.0, 200.0, 240.0, 48.0)
    }

    #[test]
    fn easing_is_monotonic_and_pinned_at_the_ends() {
        assert_eq!(DROP_ANIMATION_EASING.ease(0.0), 0.0);
        assert_eq!(DROP_ANIMATION_EASING.ease(1.0), 1.0);
        let mut previous = 0.0;
        for step in 1..=20 {
            let value = DROP_ANIMATION_EASING.ease(step as f64 / 20.0);
            assert!(value >= previous);
            previous = value;
        }
        // front-loaded curve
        assert!(DROP_ANIMATION_EASING.ease(0.5) > 0.5);
    }

    #[test]
    fn list_drop_waits_for_the_landed_rect_then_interpolates() {
        let mut animator = DropAnimator::new(false);
        let source = DragSource::list("inbox");
        assert!(animator.begin_list_drop(&task_payload(), Some(&source), Some(from_rect())));

        let animation = animator.current().expect("animation");
        assert_eq!(animation.kind, DropAnimationKind::List);
        assert_eq!(animation.frame_at(0), None);

        let landed = Rect::new(400.0, 80.0, 240.0, 48.0);
        animator.settle(Some(landed));
        let animation = animator.current().expect("animation");
        assert_eq!(animation.frame_at(0), Some(from_rect()));
        assert_eq!(animation.frame_at(DROP_ANIMATION_DURATION_MS), Some(landed));
        let middle = animation.frame_at(110).expect("frame");
        assert!(middle.left > 100.0 && middle.left < 400.0);
        assert!(animation.is_finished(300));
    }

    #[test]
    fn missing_landed_rect_clears_the_animation() {
        let mut animator = DropAnimator::new(false);
        let source = DragSource::list("todo");
        animator.begin_list_drop(&task_payload(), Some(&source), Some(from_rect()));
        animator.settle(None);
        assert!(animator.current().is_none());
    }

    #[test]
    fn calendar_drop_targets_its_origin() {
        let mut animator = DropAnimator::new(false);
        let source = DragSource::list("inbox");
        assert!(animator.begin_calendar_drop(&task_payload(), Some(&source), Some(from_rect())));

        let animation = animator.current().expect("animation");
        assert_eq!(animation.kind, DropAnimationKind::Calendar);
        assert_eq!(animation.to, Some(from_rect()));
    }

    #[test]
    fn only_task_cards_from_lists_animate() {
        let mut animator = DropAnimator::new(false);
        let calendar = DragSource::Calendar { date: None };
        assert!(!animator.begin_list_drop(&task_payload(), Some(&calendar), Some(from_rect())));
        assert!(!animator.begin_list_drop(&task_payload(), None, Some(from_rect())));
        assert!(!animator.begin_list_drop(&task_payload(), Some(&DragSource::list("inbox")), None));
        assert!(animator.current().is_none());
    }

    #[test]
    fn reduced_motion_suppresses_every_kind() {
        let mut animator = DropAnimator::new(true);
        let source = DragSource::list("inbox");
        let task = Task::new("t1", "Write report");

        assert!(!animator.begin_list_drop(&task_payload(), Some(&source), Some(from_rect())));
        assert!(!animator.begin_calendar_drop(&task_payload(), Some(&source), Some(from_rect())));
        assert!(!animator.begin_cancel(&task, Some(from_rect())));
        assert!(animator.current().is_none());
    }

    #[test]
    fn cancel_animates_back_to_the_card() {
        let mut animator = DropAnimator::new(false);
        let task = Task::new("t1", "Write report");
        assert!(animator.begin_cancel(&task, Some(from_rect())));
        animator.settle(Some(Rect::new(0.0, 0.0, 240.0, 48.0)));

        let animation = animator.current().expect("animation");
        assert_eq!(animation.kind, DropAnimationKind::Cancel);
        assert_eq!(animation.frame_at(500), Some(Rect::new(0.0, 0.0, 240.0, 48.0)));
    }
}
