use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

pub const DAY_MINUTES: i32 = 24 * 60;
pub const ROUND_MINUTES: i32 = 15;
pub const PIXELS_PER_MINUTE: f64 = 1.0;
pub const MIN_RESIZE_MINUTES: i32 = ROUND_MINUTES;
/// Longest block a day column can hold.
pub const MAX_BLOCK_MINUTES: u32 = DAY_MINUTES as u32;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Screen rectangle in the same coordinate space as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right() && point.y >= self.top && point.y < self.bottom()
    }

    /// Zero when `x` lies within the horizontal span.
    pub fn horizontal_distance(&self, x: f64) -> f64 {
        if x < self.left {
            self.left - x
        } else if x > self.right() {
            x - self.right()
        } else {
            0.0
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.width, self.height)
    }
}

pub fn clamp_minutes(value: i32) -> i32 {
    value.clamp(0, DAY_MINUTES - 1)
}

/// Rounds half-up to the nearest multiple of `step`.
pub fn round_to_step(value: f64, step: i32) -> i32 {
    if step <= 0 || !value.is_finite() {
        return 0;
    }
    let step_f = f64::from(step);
    let steps = (value / step_f + 0.5).floor();
    (steps * step_f) as i32
}

/// Minute-of-day for a vertical offset inside a day column, after removing the grab offset.
pub fn minutes_from_offset(y_offset: f64, grab_offset_y: f64, pixels_per_minute: f64, step: i32) -> i32 {
    let pixels_per_minute = if pixels_per_minute > 0.0 {
        pixels_per_minute
    } else {
        PIXELS_PER_MINUTE
    };
    clamp_minutes(round_to_step((y_offset - grab_offset_y) / pixels_per_minute, step))
}

pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn minutes_in_day(instant: DateTime<Utc>, tz: Tz) -> i32 {
    let local = instant.with_timezone(&tz);
    (local.hour() * 60 + local.minute()) as i32
}

/// Local wall-clock `minutes` after midnight of `date`. Values past the end of the day roll into
/// the following days; times inside a DST gap move forward by an hour.
pub fn instant_at_minutes(date: NaiveDate, minutes: i32, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let naive = midnight + Duration::minutes(i64::from(minutes));
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Resize by dragging the bottom edge. Returns the new duration.
pub fn resize_from_end(base_start: i32, base_duration: i32, delta_minutes: f64, step: i32) -> i32 {
    let max_duration = (DAY_MINUTES - base_start).max(1);
    let min_duration = MIN_RESIZE_MINUTES.min(max_duration);
    round_to_step(f64::from(base_duration) + delta_minutes, step)
        .max(min_duration)
        .min(max_duration)
}

/// Resize by dragging the top edge; the end stays fixed. Returns `(start, duration)`.
pub fn resize_from_start(base_start: i32, base_duration: i32, delta_minutes: f64, step: i32) -> (i32, i32) {
    let base_end = base_start + base_duration;
    let min_duration = MIN_RESIZE_MINUTES.min(base_end);
    let max_start = (base_end - min_duration).min(DAY_MINUTES - min_duration).max(0);
    let next_start = round_to_step(f64::from(base_start) + delta_minutes, step).clamp(0, max_start);
    let next_duration = min_duration.max(base_end - next_start);
    (next_start, next_duration)
}

/// Per-frame scroll step for a pointer near the edges of `bounds`. Speed ramps quadratically over
/// the `edge` band and is capped at `max_speed`.
pub fn autoscroll_velocity(position: Point, bounds: Rect, edge: f64, max_speed: f64) -> (f64, f64) {
    if edge <= 0.0 {
        return (0.0, 0.0);
    }
    let ramp = |delta: f64| {
        let ratio = (delta / edge).min(1.0);
        max_speed.min(ratio * ratio * max_speed)
    };

    let dx = if position.x < bounds.left + edge {
        -ramp(bounds.left + edge - position.x)
    } else if position.x > bounds.right() - edge {
        ramp(position.x - (bounds.right() - edge))
    } else {
        0.0
    };
    let dy = if position.y < bounds.top + edge {
        -ramp(bounds.top + edge - position.y)
    } else if position.y > bounds.bottom() - edge {
        ramp(position.y - (bounds.bottom() - edge))
    } else {
        0.0
    };
    (dx, dy)
}
