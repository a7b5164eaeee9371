pub mod bootstrap;
pub mod calendar_feed;
pub mod drag_engine;
pub mod drop_actions;
pub mod drop_animation;
pub mod planner;
pub mod task_store;
