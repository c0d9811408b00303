//! Timeline layout primitives.
//!
//! This module provides:
//! - Scheduled item values with conflict annotations
//! - Pairwise conflict detection with a tolerance window
//! - Pixel/time coordinate mapping with zoom and snap-to-grid

mod conflict;
mod coords;
mod item;

pub use conflict::{detect_conflicts, ConflictDetector, DEFAULT_TOLERANCE_MINUTES};
pub use coords::{
    drag_delta_to_minutes, minutes_since_midnight, offset_to_time, shift_by_drag, snap_to_grid,
    time_to_offset, MINUTES_PER_DAY,
};
pub use item::{ConflictState, ScheduledItem};
