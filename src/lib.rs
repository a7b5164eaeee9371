pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{BootstrapResult, bootstrap_workspace, init_tracing, open_planner};
pub use application::calendar_feed::{CalendarFeedService, CalendarFeedState, RetryPolicy};
pub use application::drag_engine::{DragEngine, ElementId, ElementRole, PointerButton, PointerEvent, ReleaseOutcome};
pub use application::planner::{Planner, PlannerDragEngine};
pub use application::task_store::TaskStore;
pub use domain::models::{CalendarDraftSlot, DragPayload, PlannerState, ScheduledTime, Task, TaskStatus};
pub use infrastructure::config::PlannerConfig;
pub use infrastructure::error::InfraError;
