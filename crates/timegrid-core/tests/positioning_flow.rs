//! End-to-end flow: load a snapshot, select items, drag a target window,
//! batch-position into it, and re-detect conflicts -- including the
//! partial-failure and cancellation behaviour of the persistence loop.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

use timegrid_core::{
    BatchPositioner, CancelFlag, ConflictState, DateRange, EngineConfig, ItemProvider,
    PositioningError, ProviderError, ScheduledItem, SortPolicy, TimeUpdater, TimelineEngine,
    UpdateError,
};

fn t(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
}

struct FixedProvider {
    items: Vec<ScheduledItem>,
}

#[async_trait]
impl ItemProvider for FixedProvider {
    async fn fetch_items(&self, _range: &DateRange) -> Result<Vec<ScheduledItem>, ProviderError> {
        Ok(self.items.clone())
    }
}

/// Records every write; optionally fails from the nth call on, or raises a
/// cancel flag after each write (to exercise the between-items check).
#[derive(Default)]
struct ScriptedUpdater {
    calls: Mutex<Vec<(Option<String>, DateTime<Utc>, DateTime<Utc>)>>,
    fail_from_call: Option<usize>,
    cancel_after_write: Option<CancelFlag>,
}

#[async_trait]
impl TimeUpdater for ScriptedUpdater {
    async fn update_time(
        &self,
        source_task_id: Option<&str>,
        _source_link_id: Option<&str>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<(), UpdateError> {
        let mut calls = self.calls.lock().unwrap();
        if let Some(n) = self.fail_from_call {
            if calls.len() >= n {
                return Err(UpdateError::new("simulated backend failure"));
            }
        }
        calls.push((source_task_id.map(str::to_string), new_start, new_end));
        if let Some(flag) = &self.cancel_after_write {
            flag.cancel();
        }
        Ok(())
    }
}

fn snapshot() -> Vec<ScheduledItem> {
    vec![
        ScheduledItem::new("Standup", t(9, 0), t(9, 30))
            .with_id("standup")
            .with_source_task("task-standup"),
        ScheduledItem::new("Code review", t(9, 15), t(10, 0))
            .with_id("review")
            .with_source_task("task-review"),
        ScheduledItem::new("Draft notes", t(10, 5), t(10, 35))
            .with_id("notes")
            .with_source_task("task-notes"),
        ScheduledItem::new("Team offsite", t(13, 0), t(15, 0))
            .with_id("offsite")
            .external(),
    ]
}

#[tokio::test]
async fn full_flow_reload_select_drag_place() {
    let engine_config = EngineConfig {
        gap_minutes: 10,
        tolerance_minutes: 15,
        ..Default::default()
    };
    let mut engine = TimelineEngine::with_config(engine_config);
    let provider = FixedProvider { items: snapshot() };
    let range = DateRange::new(t(0, 0), t(0, 0) + chrono::Duration::days(1));

    // Load and verify the initial conflict annotations.
    let items = engine.load_range(&provider, &range).await.unwrap();
    assert_eq!(items[0].conflict_state, ConflictState::Overlap);
    assert_eq!(items[1].conflict_state, ConflictState::Overlap);
    assert_eq!(items[2].conflict_state, ConflictState::ToleranceWarning);
    assert_eq!(items[3].conflict_state, ConflictState::NoConflict);

    // Select the two conflicting owned items by clicking them.
    engine.selection_mut().toggle_select(&items[0]).unwrap();
    engine.selection_mut().toggle_select(&items[1]).unwrap();

    // Drag out an afternoon window.
    engine.selection_mut().begin_drag(t(15, 30));
    engine.selection_mut().update_drag(t(17, 30));
    let window = engine.selection_mut().end_drag().unwrap();

    let updater = ScriptedUpdater::default();
    let placed = engine
        .position_selection(
            &items,
            window.start,
            window.end,
            SortPolicy::CustomOrder,
            &updater,
        )
        .await
        .unwrap();

    // Standup (30min) then review (45min), separated by the 10min gap.
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].item.start_time, t(15, 30));
    assert_eq!(placed[0].item.end_time, t(16, 0));
    assert_eq!(placed[1].item.start_time, t(16, 10));
    assert_eq!(placed[1].item.end_time, t(16, 55));

    // Writes happened in placement order, with the owner's keys.
    let calls = updater.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0.as_deref(), Some("task-standup"));
    assert_eq!(calls[1].0.as_deref(), Some("task-review"));

    // Session state is cleared; a re-run of detection shows the moves fixed
    // the morning overlap.
    assert!(engine.selection().selected().is_empty());
    assert!(engine.selection().committed_box().is_none());

    let mut reloaded: Vec<ScheduledItem> = items
        .iter()
        .map(|item| {
            placed
                .iter()
                .find(|p| p.item.id == item.id)
                .map(|p| p.item.clone())
                .unwrap_or_else(|| item.clone())
        })
        .collect();
    reloaded = engine.detect_conflicts(reloaded);
    for item in &reloaded {
        assert_ne!(item.conflict_state, ConflictState::Overlap, "{}", item.id);
    }
}

#[tokio::test]
async fn mid_batch_failure_reports_applied_prefix() {
    let items = vec![
        ScheduledItem::new("One", t(8, 0), t(8, 30)).with_id("one"),
        ScheduledItem::new("Two", t(8, 0), t(8, 30)).with_id("two"),
        ScheduledItem::new("Three", t(8, 0), t(8, 30)).with_id("three"),
    ];
    let updater = ScriptedUpdater {
        fail_from_call: Some(2),
        ..Default::default()
    };

    let err = BatchPositioner::new()
        .with_gap(5)
        .position(
            &items,
            t(9, 0),
            t(12, 0),
            SortPolicy::CustomOrder,
            &updater,
            None,
        )
        .await
        .unwrap_err();

    // The first two writes landed and stay applied; the third aborted the run.
    match err {
        PositioningError::UpdateFailed { applied, source } => {
            assert_eq!(applied, 2);
            assert_eq!(source.message, "simulated backend failure");
        }
        other => panic!("expected UpdateFailed, got {other:?}"),
    }
    assert_eq!(updater.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn cancellation_between_updates_leaves_prefix() {
    let items = vec![
        ScheduledItem::new("One", t(8, 0), t(8, 30)).with_id("one"),
        ScheduledItem::new("Two", t(8, 0), t(8, 30)).with_id("two"),
    ];
    let flag = CancelFlag::new();
    let updater = ScriptedUpdater {
        cancel_after_write: Some(flag.clone()),
        ..Default::default()
    };

    let err = BatchPositioner::new()
        .position(
            &items,
            t(9, 0),
            t(12, 0),
            SortPolicy::CustomOrder,
            &updater,
            Some(&flag),
        )
        .await
        .unwrap_err();

    // The flag is only honoured between items: the first write completed,
    // the second was never issued.
    assert!(matches!(err, PositioningError::Cancelled { applied: 1 }));
    assert_eq!(updater.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn already_cancelled_run_writes_nothing() {
    let items = vec![ScheduledItem::new("One", t(8, 0), t(8, 30)).with_id("one")];
    let flag = CancelFlag::new();
    flag.cancel();
    let updater = ScriptedUpdater::default();

    let err = BatchPositioner::new()
        .position(
            &items,
            t(9, 0),
            t(12, 0),
            SortPolicy::CustomOrder,
            &updater,
            Some(&flag),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PositioningError::Cancelled { applied: 0 }));
    assert!(updater.calls.lock().unwrap().is_empty());
}
