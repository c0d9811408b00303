//! Batch positioning of selected items into a target time window.
//!
//! Validates capacity up front, sorts the modifiable subset by a policy,
//! then lays items out back-to-back from the window start with a fixed gap
//! between neighbours. Computed placements are handed to the external
//! [`TimeUpdater`] one at a time; a mid-batch failure aborts the remainder
//! and reports how many items were already written. Nothing is rolled back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PositioningError;
use crate::provider::TimeUpdater;
use crate::timeline::ScheduledItem;

/// Default spacing between consecutively placed items.
pub const DEFAULT_GAP_MINUTES: i64 = 5;

/// Order in which the modifiable subset is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Caller-supplied order, kept verbatim (manual drag-to-reorder lists)
    CustomOrder,
    DifficultyDescending,
    DurationAscending,
    DurationDescending,
    /// By title, case-insensitive
    Alphabetical,
    /// By category key ascending; items with no category sort last
    ByCategory,
}

impl SortPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomOrder => "custom_order",
            Self::DifficultyDescending => "difficulty_descending",
            Self::DurationAscending => "duration_ascending",
            Self::DurationDescending => "duration_descending",
            Self::Alphabetical => "alphabetical",
            Self::ByCategory => "by_category",
        }
    }
}

/// Result of a pure capacity pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitCheck {
    Fits,
    DoesNotFit { required: i64, available: i64 },
}

/// A computed placement: the repositioned item plus where it came from.
///
/// The previous times let a caller reconcile or revert after a partial
/// failure; the engine itself never issues compensating writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedItem {
    pub item: ScheduledItem,
    pub previous_start: DateTime<Utc>,
    pub previous_end: DateTime<Utc>,
}

/// Cooperative cancellation flag for an in-flight batch run.
///
/// Checked between item updates, never mid-update, so a cancelled run
/// leaves a well-defined prefix of items repositioned.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequential batch positioner.
pub struct BatchPositioner {
    /// Spacing inserted between consecutively placed items (minutes)
    gap_minutes: i64,
}

impl BatchPositioner {
    /// Create a positioner with the default gap.
    pub fn new() -> Self {
        Self {
            gap_minutes: DEFAULT_GAP_MINUTES,
        }
    }

    /// Set the gap between placed items in minutes.
    pub fn with_gap(mut self, minutes: i64) -> Self {
        self.gap_minutes = minutes.max(0);
        self
    }

    /// Pure capacity pre-check over the modifiable subset of `items`.
    ///
    /// `Fits` iff the summed durations plus one gap per adjacent pair fit
    /// in the window.
    pub fn validate_fit(
        &self,
        items: &[ScheduledItem],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> FitCheck {
        let modifiable: Vec<&ScheduledItem> = items.iter().filter(|i| !i.external).collect();
        let required = self.required_minutes(&modifiable);
        let available = (window_end - window_start).num_minutes();
        if required > available {
            FitCheck::DoesNotFit {
                required,
                available,
            }
        } else {
            FitCheck::Fits
        }
    }

    /// Compute placements without touching any collaborator.
    ///
    /// # Errors
    /// - `EmptySelection` when `items` is empty
    /// - `NoModifiableItems` when every item is external
    /// - `InvalidWindow` when `window_start >= window_end`
    /// - `InsufficientCapacity` when the items plus gaps do not fit
    pub fn plan(
        &self,
        items: &[ScheduledItem],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        policy: SortPolicy,
    ) -> Result<Vec<PlacedItem>, PositioningError> {
        if items.is_empty() {
            return Err(PositioningError::EmptySelection);
        }

        let mut modifiable: Vec<&ScheduledItem> = items.iter().filter(|i| !i.external).collect();
        if modifiable.is_empty() {
            return Err(PositioningError::NoModifiableItems);
        }

        if window_start >= window_end {
            return Err(PositioningError::InvalidWindow {
                start: window_start,
                end: window_end,
            });
        }

        Self::sort_by_policy(&mut modifiable, policy);

        let required = self.required_minutes(&modifiable);
        let available = (window_end - window_start).num_minutes();
        if required > available {
            return Err(PositioningError::InsufficientCapacity {
                required,
                available,
            });
        }

        let mut placements = Vec::with_capacity(modifiable.len());
        let mut cursor = window_start;
        for item in modifiable {
            // Exact signed duration, so sub-minute precision survives the move.
            let duration = item.end_time - item.start_time;
            let placed = item.with_times(cursor, cursor + duration)?;
            debug!(
                id = %placed.id,
                start = %placed.start_time,
                end = %placed.end_time,
                policy = policy.as_str(),
                "planned placement"
            );
            placements.push(PlacedItem {
                previous_start: item.start_time,
                previous_end: item.end_time,
                item: placed,
            });
            cursor = cursor + duration + chrono::Duration::minutes(self.gap_minutes);
        }

        Ok(placements)
    }

    /// Hand computed placements to the external updater, one at a time.
    ///
    /// Strictly sequential: each update is awaited before the next is
    /// issued, so an abort never leaves later writes in flight. Returns the
    /// number of items applied.
    ///
    /// # Errors
    /// - `UpdateFailed` when a single update fails; the remainder is skipped
    /// - `Cancelled` when `cancel` was raised between updates
    pub async fn apply(
        &self,
        placements: &[PlacedItem],
        updater: &dyn TimeUpdater,
        cancel: Option<&CancelFlag>,
    ) -> Result<usize, PositioningError> {
        let mut applied = 0usize;
        for placed in placements {
            if let Some(flag) = cancel {
                if flag.is_cancelled() {
                    warn!(applied, total = placements.len(), "batch run cancelled");
                    return Err(PositioningError::Cancelled { applied });
                }
            }

            updater
                .update_time(
                    placed.item.source_task_id.as_deref(),
                    placed.item.source_link_id.as_deref(),
                    placed.item.start_time,
                    placed.item.end_time,
                )
                .await
                .map_err(|source| {
                    warn!(applied, error = %source, "batch run aborted by update failure");
                    PositioningError::UpdateFailed { applied, source }
                })?;
            applied += 1;
        }

        info!(applied, "batch placement applied");
        Ok(applied)
    }

    /// Plan and apply in one call.
    pub async fn position(
        &self,
        items: &[ScheduledItem],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        policy: SortPolicy,
        updater: &dyn TimeUpdater,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<PlacedItem>, PositioningError> {
        let placements = self.plan(items, window_start, window_end, policy)?;
        self.apply(&placements, updater, cancel).await?;
        Ok(placements)
    }

    /// Summed durations plus one gap per adjacent pair.
    fn required_minutes(&self, items: &[&ScheduledItem]) -> i64 {
        let durations: i64 = items.iter().map(|i| i.duration_minutes()).sum();
        let gaps = self.gap_minutes * (items.len() as i64 - 1).max(0);
        durations + gaps
    }

    /// Stable sort, so equal keys keep their incoming order.
    fn sort_by_policy(items: &mut [&ScheduledItem], policy: SortPolicy) {
        match policy {
            SortPolicy::CustomOrder => {}
            SortPolicy::DifficultyDescending => {
                items.sort_by(|a, b| b.difficulty_percent.cmp(&a.difficulty_percent));
            }
            SortPolicy::DurationAscending => {
                items.sort_by_key(|i| i.duration_minutes());
            }
            SortPolicy::DurationDescending => {
                items.sort_by(|a, b| b.duration_minutes().cmp(&a.duration_minutes()));
            }
            SortPolicy::Alphabetical => {
                items.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
            }
            SortPolicy::ByCategory => {
                items.sort_by(|a, b| match (&a.category_key, &b.category_key) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                });
            }
        }
    }
}

impl Default for BatchPositioner {
    fn default() -> Self {
        Self::new()
    }
}
