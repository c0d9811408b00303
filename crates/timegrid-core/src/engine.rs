//! Engine facade tying the timeline pieces together.
//!
//! Owns the numeric settings the caller hands in (zoom, grid, tolerance,
//! gap -- defaults live here, persistence does not) and the UI-session
//! selection state, and exposes the two operations the surrounding
//! application calls: conflict queries and batch placement of the current
//! selection.

use chrono::NaiveDate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{PositioningError, ProviderError, ValidationError};
use crate::positioner::{BatchPositioner, FitCheck, PlacedItem, SortPolicy};
use crate::provider::{DateRange, ItemProvider, TimeUpdater};
use crate::selection::SelectionState;
use crate::timeline::{ConflictDetector, ScheduledItem};

/// Caller-supplied engine settings.
///
/// Plain numbers with engine-side defaults; the caller owns where (and
/// whether) they are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Vertical zoom factor for the day column
    pub pixels_per_minute: f64,
    /// Snap-to-grid interval for drag gestures
    pub grid_minutes: i64,
    /// Minimum acceptable gap before a conflict warning
    pub tolerance_minutes: i64,
    /// Spacing between consecutively placed items
    pub gap_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pixels_per_minute: 2.0,
            grid_minutes: 15,
            tolerance_minutes: 15,
            gap_minutes: 5,
        }
    }
}

impl EngineConfig {
    /// Check the settings for values the engine cannot work with.
    ///
    /// # Errors
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pixels_per_minute <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "pixels_per_minute".into(),
                message: "must be positive".into(),
            });
        }
        if self.grid_minutes <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "grid_minutes".into(),
                message: "must be positive".into(),
            });
        }
        if self.tolerance_minutes < 0 {
            return Err(ValidationError::InvalidValue {
                field: "tolerance_minutes".into(),
                message: "must not be negative".into(),
            });
        }
        if self.gap_minutes < 0 {
            return Err(ValidationError::InvalidValue {
                field: "gap_minutes".into(),
                message: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

/// Timeline scheduling engine.
///
/// Single-threaded by design: selection transitions are synchronous, and
/// the only suspension point is the sequential persistence loop inside
/// batch placement. Callers must not run two placements concurrently over
/// overlapping item sets.
#[derive(Debug, Default)]
pub struct TimelineEngine {
    config: EngineConfig,
    selection: SelectionState,
}

impl TimelineEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom settings.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            selection: SelectionState::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    /// Annotate a single rendered day's items with conflict states.
    pub fn detect_conflicts(&self, items: Vec<ScheduledItem>) -> Vec<ScheduledItem> {
        crate::timeline::detect_conflicts(items, self.config.tolerance_minutes)
    }

    /// Annotate a multi-day snapshot, day by day.
    ///
    /// Items are grouped by the calendar day they start on, so cross-day
    /// pairs never influence each other. Input order is preserved.
    pub fn annotate_by_day(&self, mut items: Vec<ScheduledItem>) -> Vec<ScheduledItem> {
        let mut by_day: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            by_day
                .entry(item.start_time.date_naive())
                .or_default()
                .push(index);
        }

        let detector = ConflictDetector::new().with_tolerance(self.config.tolerance_minutes);
        for (day, indices) in &by_day {
            let mut day_items: Vec<ScheduledItem> =
                indices.iter().map(|&i| items[i].clone()).collect();
            detector.annotate(&mut day_items);
            debug!(%day, count = day_items.len(), "annotated day");
            for (&index, annotated) in indices.iter().zip(day_items) {
                items[index] = annotated;
            }
        }
        items
    }

    /// Fetch a date range from the item source and annotate it.
    ///
    /// # Errors
    /// Propagates the provider's error; nothing is annotated on failure.
    pub async fn load_range(
        &self,
        provider: &dyn ItemProvider,
        range: &DateRange,
    ) -> Result<Vec<ScheduledItem>, ProviderError> {
        let items = provider.fetch_items(range).await?;
        info!(count = items.len(), "loaded item snapshot");
        Ok(self.annotate_by_day(items))
    }

    /// Pure capacity pre-check with the configured gap.
    pub fn validate_fit(
        &self,
        items: &[ScheduledItem],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> FitCheck {
        BatchPositioner::new()
            .with_gap(self.config.gap_minutes)
            .validate_fit(items, window_start, window_end)
    }

    /// Batch-position the currently selected items into a window.
    ///
    /// The selection's manual order is authoritative for
    /// [`SortPolicy::CustomOrder`]. Selected ids missing from `items`
    /// (stale after a reload) are skipped. On success the selection and
    /// any committed box are cleared; on any error they are kept so the
    /// caller can reconcile and retry.
    ///
    /// # Errors
    /// See [`PositioningError`]; `UpdateFailed`/`Cancelled` carry the
    /// count of items already written, which are not rolled back.
    pub async fn position_selection(
        &mut self,
        items: &[ScheduledItem],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        policy: SortPolicy,
        updater: &dyn TimeUpdater,
    ) -> Result<Vec<PlacedItem>, PositioningError> {
        let chosen: Vec<ScheduledItem> = self
            .selection
            .selected()
            .ids()
            .iter()
            .filter_map(|id| items.iter().find(|item| &item.id == id))
            .cloned()
            .collect();

        let placed = BatchPositioner::new()
            .with_gap(self.config.gap_minutes)
            .position(&chosen, window_start, window_end, policy, updater, None)
            .await?;

        self.selection.reset();
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpdateError;
    use crate::timeline::ConflictState;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn item(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ScheduledItem {
        ScheduledItem::new(id.to_uppercase(), start, end)
            .with_id(id)
            .with_source_task(format!("task-{id}"))
    }

    #[derive(Default)]
    struct RecordingUpdater {
        calls: Mutex<Vec<(Option<String>, DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl TimeUpdater for RecordingUpdater {
        async fn update_time(
            &self,
            source_task_id: Option<&str>,
            _source_link_id: Option<&str>,
            new_start: DateTime<Utc>,
            new_end: DateTime<Utc>,
        ) -> Result<(), UpdateError> {
            self.calls.lock().unwrap().push((
                source_task_id.map(str::to_string),
                new_start,
                new_end,
            ));
            Ok(())
        }
    }

    #[test]
    fn test_config_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());

        let bad = EngineConfig {
            grid_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidValue { field, .. }) if field == "grid_minutes"
        ));
    }

    #[test]
    fn test_annotate_by_day_isolates_days() {
        let engine = TimelineEngine::new();
        // Same clock times on different days: no conflict across days.
        let monday = item("a", t(9, 0), t(10, 0));
        let tuesday = item(
            "b",
            t(9, 30) + Duration::days(1),
            t(10, 30) + Duration::days(1),
        );
        let monday_clash = item("c", t(9, 30), t(10, 30));

        let annotated = engine.annotate_by_day(vec![monday, tuesday, monday_clash]);
        assert_eq!(annotated[0].conflict_state, ConflictState::Overlap);
        assert_eq!(annotated[1].conflict_state, ConflictState::NoConflict);
        assert_eq!(annotated[2].conflict_state, ConflictState::Overlap);
        // Input order preserved.
        assert_eq!(annotated[1].id, "b");
    }

    #[tokio::test]
    async fn test_position_selection_uses_manual_order() {
        let mut engine = TimelineEngine::with_config(EngineConfig {
            gap_minutes: 15,
            ..Default::default()
        });
        let items = vec![
            item("a", t(7, 0), t(7, 30)),
            item("b", t(8, 0), t(9, 0)),
            item("c", t(13, 0), t(13, 45)),
        ];
        // Select in reverse order; CustomOrder must honour it.
        engine.selection_mut().toggle_select(&items[2]).unwrap();
        engine.selection_mut().toggle_select(&items[0]).unwrap();

        let updater = RecordingUpdater::default();
        let placed = engine
            .position_selection(
                &items,
                t(9, 0),
                t(12, 0),
                SortPolicy::CustomOrder,
                &updater,
            )
            .await
            .unwrap();

        let ids: Vec<&str> = placed.iter().map(|p| p.item.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);

        let calls = updater.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0.as_deref(), Some("task-c"));
        assert_eq!(calls[0].1, t(9, 0));
        assert_eq!(calls[0].2, t(9, 45));
        assert_eq!(calls[1].1, t(10, 0));

        // Successful placement clears selection and box.
        assert!(engine.selection().selected().is_empty());
    }

    #[tokio::test]
    async fn test_failed_position_keeps_selection() {
        struct FailingUpdater;

        #[async_trait]
        impl TimeUpdater for FailingUpdater {
            async fn update_time(
                &self,
                _: Option<&str>,
                _: Option<&str>,
                _: DateTime<Utc>,
                _: DateTime<Utc>,
            ) -> Result<(), UpdateError> {
                Err(UpdateError::new("backend offline"))
            }
        }

        let mut engine = TimelineEngine::new();
        let items = vec![item("a", t(7, 0), t(7, 30))];
        engine.selection_mut().toggle_select(&items[0]).unwrap();

        let err = engine
            .position_selection(&items, t(9, 0), t(12, 0), SortPolicy::CustomOrder, &FailingUpdater)
            .await
            .unwrap_err();

        assert!(matches!(err, PositioningError::UpdateFailed { applied: 0, .. }));
        assert_eq!(engine.selection().selected().ids(), ["a"]);
    }

    #[tokio::test]
    async fn test_stale_selection_ids_are_skipped() {
        let mut engine = TimelineEngine::new();
        let ghost = item("ghost", t(7, 0), t(7, 30));
        let real = item("a", t(7, 0), t(7, 30));
        engine.selection_mut().toggle_select(&ghost).unwrap();
        engine.selection_mut().toggle_select(&real).unwrap();

        let updater = RecordingUpdater::default();
        let placed = engine
            .position_selection(
                &[real],
                t(9, 0),
                t(12, 0),
                SortPolicy::CustomOrder,
                &updater,
            )
            .await
            .unwrap();

        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].item.id, "a");
    }
}
