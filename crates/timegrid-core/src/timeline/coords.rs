//! Pixel/time coordinate mapping for the vertical 24-hour axis.
//!
//! Pure arithmetic between clock times and vertical pixel offsets, given a
//! zoom factor (pixels per minute) and a snap grid. This layer never
//! validates business rules: out-of-range inputs are clamped, not rejected.

use chrono::{DateTime, Duration, Timelike, Utc};

/// Minutes in one rendered day column.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes elapsed since the item's local midnight (seconds ignored).
pub fn minutes_since_midnight(time: DateTime<Utc>) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Vertical pixel offset of a clock time.
pub fn time_to_offset(time: DateTime<Utc>, pixels_per_minute: f64) -> f64 {
    minutes_since_midnight(time) as f64 * pixels_per_minute
}

/// Inverse of [`time_to_offset`], clamped to `[00:00, 23:59]` of `day`.
pub fn offset_to_time(day: DateTime<Utc>, offset: f64, pixels_per_minute: f64) -> DateTime<Utc> {
    let raw_minutes = if pixels_per_minute > 0.0 {
        offset / pixels_per_minute
    } else {
        0.0
    };
    let minutes = round_half_up(raw_minutes).clamp(0, MINUTES_PER_DAY - 1);
    at_minutes(day, minutes)
}

/// Round a time to the nearest multiple of `grid_minutes` (round-half-up),
/// clamped to the valid hour/minute range of its day.
pub fn snap_to_grid(time: DateTime<Utc>, grid_minutes: i64) -> DateTime<Utc> {
    let minutes = minutes_since_midnight(time);
    if grid_minutes <= 0 {
        return at_minutes(time, minutes);
    }
    let snapped = ((minutes + grid_minutes / 2) / grid_minutes) * grid_minutes;
    at_minutes(time, snapped.clamp(0, MINUTES_PER_DAY - 1))
}

/// Convert a drag distance to a grid-snapped minute delta.
///
/// The raw pixel distance is rounded half-up to whole minutes first, then
/// the minute delta is snapped to the grid. Negative deltas (upward drags)
/// are supported.
pub fn drag_delta_to_minutes(delta_pixels: f64, pixels_per_minute: f64, grid_minutes: i64) -> i64 {
    let raw_minutes = if pixels_per_minute > 0.0 {
        delta_pixels / pixels_per_minute
    } else {
        0.0
    };
    let minutes = round_half_up(raw_minutes);
    if grid_minutes <= 0 {
        return minutes;
    }
    round_half_up(minutes as f64 / grid_minutes as f64) * grid_minutes
}

/// Shift both endpoints of a range by the same snapped drag delta.
///
/// Duration is preserved exactly.
pub fn shift_by_drag(
    original_start: DateTime<Utc>,
    original_end: DateTime<Utc>,
    delta_pixels: f64,
    pixels_per_minute: f64,
    grid_minutes: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let delta = Duration::minutes(drag_delta_to_minutes(
        delta_pixels,
        pixels_per_minute,
        grid_minutes,
    ));
    (original_start + delta, original_end + delta)
}

/// Round-half-up: 2.5 -> 3, -2.5 -> -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Rebuild a timestamp at `minutes` past midnight on the same day,
/// truncating seconds.
fn at_minutes(day: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let minutes = minutes.clamp(0, MINUTES_PER_DAY - 1);
    let hour = (minutes / 60) as u32;
    let minute = (minutes % 60) as u32;
    match day.date_naive().and_hms_opt(hour, minute, 0) {
        Some(rebuilt) => rebuilt.and_utc(),
        None => day,
    }
}
