pub mod calendar_preview;
pub mod drop_target;
pub mod flat_list;
pub mod models;
pub mod schedule;
pub mod time_grid;
