use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde_json::Value;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 4.0;
pub const DEFAULT_INDENT_PX: f64 = 24.0;
pub const DEFAULT_LIST_PADDING_PX: f64 = 16.0;
pub const DEFAULT_ROUND_MINUTES: i32 = 15;
pub const DEFAULT_PIXELS_PER_MINUTE: f64 = 1.0;
pub const DEFAULT_AUTOSCROLL_EDGE_PX: f64 = 72.0;
pub const DEFAULT_AUTOSCROLL_MAX_SPEED: f64 = 8.0;
pub const DEFAULT_FEED_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_FEED_POLL_MINUTES: i64 = 10;

/// Geometry knobs consumed by the drag engine and the list builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConfig {
    pub threshold_px: f64,
    pub indent_px: f64,
    pub list_padding_px: f64,
    pub round_minutes: i32,
    pub pixels_per_minute: f64,
    pub autoscroll_edge_px: f64,
    pub autoscroll_max_speed: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            indent_px: DEFAULT_INDENT_PX,
            list_padding_px: DEFAULT_LIST_PADDING_PX,
            round_minutes: DEFAULT_ROUND_MINUTES,
            pixels_per_minute: DEFAULT_PIXELS_PER_MINUTE,
            autoscroll_edge_px: DEFAULT_AUTOSCROLL_EDGE_PX,
            autoscroll_max_speed: DEFAULT_AUTOSCROLL_MAX_SPEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub window_days: i64,
    pub poll_minutes: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_FEED_WINDOW_DAYS,
            poll_minutes: DEFAULT_FEED_POLL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub timezone: Tz,
    pub default_slot_duration: u32,
    pub prefers_reduced_motion: bool,
    pub drag: DragConfig,
    pub feed: FeedConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            default_slot_duration: crate::domain::models::DEFAULT_SLOT_DURATION,
            prefers_reduced_motion: false,
            drag: DragConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_value(app: &Value) -> Self {
        let defaults = Self::default();
        let drag = DragConfig {
            threshold_px: positive_f64(app, "dragThresholdPx").unwrap_or(defaults.drag.threshold_px),
            indent_px: positive_f64(app, "indentPx").unwrap_or(defaults.drag.indent_px),
            list_padding_px: app
                .get("listPaddingPx")
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite() && *value >= 0.0)
                .unwrap_or(defaults.drag.list_padding_px),
            round_minutes: positive_u64(app, "roundMinutes")
                .and_then(|value| i32::try_from(value).ok())
                .unwrap_or(defaults.drag.round_minutes),
            pixels_per_minute: positive_f64(app, "pixelsPerMinute")
                .unwrap_or(defaults.drag.pixels_per_minute),
            autoscroll_edge_px: positive_f64(app, "autoscrollEdgePx")
                .unwrap_or(defaults.drag.autoscroll_edge_px),
            autoscroll_max_speed: positive_f64(app, "autoscrollMaxSpeed")
                .unwrap_or(defaults.drag.autoscroll_max_speed),
        };
        let feed = FeedConfig {
            window_days: positive_u64(app, "feedWindowDays")
                .and_then(|value| i64::try_from(value).ok())
                .unwrap_or(defaults.feed.window_days),
            poll_minutes: positive_u64(app, "feedPollMinutes")
                .and_then(|value| i64::try_from(value).ok())
                .unwrap_or(defaults.feed.poll_minutes),
        };

        Self {
            timezone: app
                .get("timezone")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .and_then(|value| value.parse::<Tz>().ok())
                .unwrap_or(defaults.timezone),
            default_slot_duration: positive_u64(app, "defaultSlotDuration")
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(defaults.default_slot_duration),
            prefers_reduced_motion: app
                .get("prefersReducedMotion")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.prefers_reduced_motion),
            drag,
            feed,
        }
    }
}

fn positive_f64(app: &Value, key: &str) -> Option<f64> {
    app.get(key)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn positive_u64(app: &Value, key: &str) -> Option<u64> {
    app.get(key).and_then(Value::as_u64).filter(|value| *value > 0)
}

fn default_app_config() -> Value {
    serde_json::json!({
        "schema": 1,
        "timezone": "UTC",
        "defaultSlotDuration": crate::domain::models::DEFAULT_SLOT_DURATION,
        "dragThresholdPx": DEFAULT_DRAG_THRESHOLD_PX,
        "indentPx": DEFAULT_INDENT_PX,
        "listPaddingPx": DEFAULT_LIST_PADDING_PX,
        "roundMinutes": DEFAULT_ROUND_MINUTES,
        "pixelsPerMinute": DEFAULT_PIXELS_PER_MINUTE,
        "autoscrollEdgePx": DEFAULT_AUTOSCROLL_EDGE_PX,
        "autoscrollMaxSpeed": DEFAULT_AUTOSCROLL_MAX_SPEED,
        "prefersReducedMotion": false,
        "feedWindowDays": DEFAULT_FEED_WINDOW_DAYS,
        "feedPollMinutes": DEFAULT_FEED_POLL_MINUTES
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_planner_config(config_dir: &Path) -> Result<PlannerConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(PlannerConfig::from_value(&app))
}
