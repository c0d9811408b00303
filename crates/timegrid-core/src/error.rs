//! Core error types for timegrid-core.
//!
//! Every fallible operation in the engine returns one of the focused error
//! enums below; [`EngineError`] is the umbrella type for callers that want a
//! single error surface.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Umbrella error type for timegrid-core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Item construction/validation errors
    #[error("Item error: {0}")]
    Item(#[from] ItemError),

    /// Batch positioning errors
    #[error("Positioning error: {0}")]
    Positioning(#[from] PositioningError),

    /// Selection state machine errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Item source errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised when constructing or re-timing a scheduled item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// End must be strictly after start; zero-length items are rejected.
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors raised by batch positioning.
///
/// Input-validation and capacity variants are reported before any
/// persistence call; `UpdateFailed` and `Cancelled` carry the number of
/// items already written, which are never rolled back.
#[derive(Error, Debug)]
pub enum PositioningError {
    /// No items were supplied
    #[error("Selection is empty")]
    EmptySelection,

    /// Every supplied item is external (read-only)
    #[error("Selection contains no modifiable items")]
    NoModifiableItems,

    /// Target window is inverted or zero-length
    #[error("Invalid window: start ({start}) must be before end ({end})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Items plus gaps do not fit in the window
    #[error("Insufficient capacity: {required} minutes required, {available} available")]
    InsufficientCapacity { required: i64, available: i64 },

    /// A single time update failed; the first `applied` items were written
    #[error("Time update failed after {applied} item(s): {source}")]
    UpdateFailed {
        applied: usize,
        #[source]
        source: UpdateError,
    },

    /// The run was cancelled between updates; the first `applied` items were written
    #[error("Batch positioning cancelled after {applied} item(s)")]
    Cancelled { applied: usize },

    /// Item re-timing failed
    #[error(transparent)]
    Item(#[from] ItemError),
}

/// Non-fatal selection rejections; state is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// External items are visible but never selectable or repositionable
    #[error("Item '{id}' comes from a read-only feed and cannot be selected")]
    ExternalItem { id: String },
}

/// Errors from the external item source.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Source could not be reached
    #[error("Item source unavailable: {0}")]
    Unavailable(String),

    /// Source returned records the engine cannot represent
    #[error("Item source returned malformed data: {0}")]
    Malformed(String),
}

/// Error returned by the external time updater for a single item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpdateError {
    pub message: String,
}

impl UpdateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid configuration value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for EngineError
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
