//! Scheduled item types and utilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ItemError;

/// Conflict classification of an item within its day.
///
/// Derived by the conflict detector and overwritten on each detection pass;
/// never persisted by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictState {
    #[default]
    NoConflict,
    ToleranceWarning,
    Overlap,
}

impl ConflictState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoConflict => "no_conflict",
            Self::ToleranceWarning => "tolerance_warning",
            Self::Overlap => "overlap",
        }
    }
}

/// A single item laid out on the timeline.
///
/// Items are value objects: one is constructed per arrangement pass and a
/// reposition produces a new item via [`with_times`](Self::with_times).
/// The `id` identifies the item within the arrangement and is distinct from
/// the owning collaborator's task/event keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub id: String,
    pub source_task_id: Option<String>,
    pub source_link_id: Option<String>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 0-100, used only by the difficulty sort policy
    #[serde(default)]
    pub difficulty_percent: u8,
    pub category_key: Option<String>,
    /// External items come from a read-only feed: visible, never repositioned
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub conflict_state: ConflictState,
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl ScheduledItem {
    /// Create a new item with a generated arrangement id.
    ///
    /// # Panics
    /// Panics if `end_time <= start_time`. Use [`try_new`](Self::try_new)
    /// for a non-panicking version.
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self::try_new(title, start_time, end_time)
            .expect("ScheduledItem::new: end_time must be greater than start_time")
    }

    /// Create a new item, returning a Result.
    ///
    /// # Errors
    /// Returns an error if `end_time <= start_time`.
    pub fn try_new(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ItemError> {
        if end_time <= start_time {
            return Err(ItemError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_task_id: None,
            source_link_id: None,
            title: title.into(),
            start_time,
            end_time,
            difficulty_percent: 0,
            category_key: None,
            external: false,
            conflict_state: ConflictState::NoConflict,
            metadata: serde_json::json!({}),
        })
    }

    /// Override the generated arrangement id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the owning task key.
    pub fn with_source_task(mut self, task_id: impl Into<String>) -> Self {
        self.source_task_id = Some(task_id.into());
        self
    }

    /// Set the owning link key.
    pub fn with_source_link(mut self, link_id: impl Into<String>) -> Self {
        self.source_link_id = Some(link_id.into());
        self
    }

    /// Set difficulty (clamped to 100).
    pub fn with_difficulty(mut self, percent: u8) -> Self {
        self.difficulty_percent = percent.min(100);
        self
    }

    /// Set the category key.
    pub fn with_category(mut self, key: impl Into<String>) -> Self {
        self.category_key = Some(key.into());
        self
    }

    /// Mark the item as externally sourced (read-only).
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    /// Get duration in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Check if this item overlaps with another.
    ///
    /// Half-open interval semantics: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_time < other.end_time && self.end_time > other.start_time
    }

    /// Check if this item overlaps a time range.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Produce a repositioned copy of this item.
    ///
    /// The conflict state is reset; it must be re-derived for the new times.
    ///
    /// # Errors
    /// Returns an error if `end <= start`.
    pub fn with_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ItemError> {
        if end <= start {
            return Err(ItemError::InvalidTimeRange { start, end });
        }
        let mut item = self.clone();
        item.start_time = start;
        item.end_time = end;
        item.conflict_state = ConflictState::NoConflict;
        Ok(item)
    }
}
