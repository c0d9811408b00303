//! Boundary traits for the engine's external collaborators.
//!
//! The engine owns no persistence: items arrive through an [`ItemProvider`]
//! snapshot and repositioned times leave through a [`TimeUpdater`]. Both are
//! narrow, object-safe async traits so callers can hand in any backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, UpdateError};
use crate::timeline::ScheduledItem;

/// A half-open date range `[start, end)` to load items for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }
}

/// Source of scheduled items for a date range.
///
/// Implementations set the `external` flag on records that originate from a
/// foreign/read-only calendar feed; the engine displays those but never
/// selects or repositions them.
#[async_trait]
pub trait ItemProvider: Send + Sync {
    async fn fetch_items(&self, range: &DateRange) -> Result<Vec<ScheduledItem>, ProviderError>;
}

/// Persists a single item's new time range.
///
/// Contract: idempotent under retry of the same arguments, and atomic per
/// item -- start and end are updated together or not at all. The engine
/// calls this strictly sequentially during a batch run.
#[async_trait]
pub trait TimeUpdater: Send + Sync {
    async fn update_time(
        &self,
        source_task_id: Option<&str>,
        source_link_id: Option<&str>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<(), UpdateError>;
}
