//! # Timegrid Core Library
//!
//! This library provides the timeline scheduling engine for Timegrid: it
//! lays a user's tasks and events out on a vertical 24-hour axis, detects
//! temporal conflicts between them, and batch-positions a multi-selection
//! into a chosen time window. Rendering, persistence, and calendar sync
//! live in the surrounding application and are reached only through the
//! boundary traits in [`provider`].
//!
//! ## Key Components
//!
//! - [`timeline`]: item values, conflict detection, pixel/time mapping
//! - [`BatchPositioner`]: capacity-checked sequential placement
//! - [`SelectionState`]: drag-to-select state machine and ordered selection
//! - [`TimelineEngine`]: facade combining the above with caller settings

pub mod engine;
pub mod error;
pub mod positioner;
pub mod provider;
pub mod selection;
pub mod timeline;

pub use engine::{EngineConfig, TimelineEngine};
pub use error::{
    EngineError, ItemError, PositioningError, ProviderError, SelectionError, UpdateError,
    ValidationError,
};
pub use positioner::{BatchPositioner, CancelFlag, FitCheck, PlacedItem, SortPolicy};
pub use provider::{DateRange, ItemProvider, TimeUpdater};
pub use selection::{
    DragState, ScreenPoint, SelectionBox, SelectionSet, SelectionState, MIN_BOX_MINUTES,
};
pub use timeline::{detect_conflicts, ConflictDetector, ConflictState, ScheduledItem};
