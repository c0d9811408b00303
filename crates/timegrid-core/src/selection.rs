//! Multi-selection and drag-to-select state machine.
//!
//! Tracks two orthogonal pieces of UI-session state: an insertion-ordered
//! set of selected item ids, and a drag gesture that produces a committed
//! time-range selection box. All transitions are synchronous and
//! all-or-nothing; a rejected command leaves state exactly as it was.
//!
//! ## Drag transitions
//!
//! ```text
//! Idle -> Dragging -> (BoxCommitted | Idle)
//! BoxCommitted <-> ContextMenuOpen
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SelectionError;
use crate::timeline::ScheduledItem;

/// Floor applied to a committed box; shorter gestures are extended.
pub const MIN_BOX_MINUTES: i64 = 15;

/// A committed time range used as the target window for batch placement or
/// as a query filter for select-all-within.
///
/// Invariant: `start < end`, normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionBox {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SelectionBox {
    /// Build a box from two gesture endpoints in either order.
    ///
    /// Spans under [`MIN_BOX_MINUTES`] are extended from the start rather
    /// than rejected, so a bare click still yields a usable box.
    pub fn normalized(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        let (start, mut end) = if a <= b { (a, b) } else { (b, a) };
        if (end - start).num_minutes() < MIN_BOX_MINUTES {
            end = start + Duration::minutes(MIN_BOX_MINUTES);
        }
        Self { start, end }
    }

    /// Build a box from an item's own time range.
    ///
    /// # Errors
    /// Rejected for external items.
    pub fn from_item(item: &ScheduledItem) -> Result<Self, SelectionError> {
        if item.external {
            return Err(SelectionError::ExternalItem {
                id: item.id.clone(),
            });
        }
        Ok(Self {
            start: item.start_time,
            end: item.end_time,
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether an item's `[start, end)` range is fully contained.
    pub fn contains_item(&self, item: &ScheduledItem) -> bool {
        item.start_time >= self.start && item.end_time <= self.end
    }
}

/// Screen-space anchor for a context menu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// Drag gesture state. The in-progress anchor/cursor pair is transient and
/// becomes a [`SelectionBox`] only at gesture end.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor: DateTime<Utc>,
        cursor: DateTime<Utc>,
    },
    BoxCommitted {
        window: SelectionBox,
    },
    ContextMenuOpen {
        window: SelectionBox,
        at: ScreenPoint,
    },
}

/// Insertion-ordered set of selected item ids.
///
/// One list serves as both membership set and manual placement order, so
/// the two can never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    order: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id if absent; returns whether it was added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.order.contains(&id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove an id; returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.order.iter().position(|existing| existing == id) {
            Some(index) => {
                self.order.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|existing| existing == id)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Selection order; authoritative for custom-order placement.
    pub fn ids(&self) -> &[String] {
        &self.order
    }
}

/// The selection state machine.
///
/// Designed for a single-threaded UI event loop: commands mutate state
/// synchronously and no transition is ever observable half-applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    drag: DragState,
    selected: SelectionSet,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// The committed box, also visible while its context menu is open.
    pub fn committed_box(&self) -> Option<SelectionBox> {
        match self.drag {
            DragState::BoxCommitted { window } | DragState::ContextMenuOpen { window, .. } => {
                Some(window)
            }
            _ => None,
        }
    }

    pub fn selected(&self) -> &SelectionSet {
        &self.selected
    }

    // ── Drag commands ────────────────────────────────────────────────

    /// Start a drag gesture; legal from any state. Any previously
    /// committed box is discarded.
    pub fn begin_drag(&mut self, at: DateTime<Utc>) {
        self.drag = DragState::Dragging {
            anchor: at,
            cursor: at,
        };
    }

    /// Move the drag cursor. Ignored outside `Dragging` -- stray move
    /// events after a cancel are routine in a UI loop.
    pub fn update_drag(&mut self, to: DateTime<Utc>) {
        if let DragState::Dragging { anchor, .. } = self.drag {
            self.drag = DragState::Dragging {
                anchor,
                cursor: to,
            };
        }
    }

    /// Commit the gesture into a normalized, floor-extended box.
    ///
    /// Returns the committed box, or `None` when no drag was in progress.
    pub fn end_drag(&mut self) -> Option<SelectionBox> {
        if let DragState::Dragging { anchor, cursor } = self.drag {
            let window = SelectionBox::normalized(anchor, cursor);
            self.drag = DragState::BoxCommitted { window };
            Some(window)
        } else {
            None
        }
    }

    /// Abort the gesture; the would-be box is discarded.
    pub fn cancel_drag(&mut self) {
        if matches!(self.drag, DragState::Dragging { .. }) {
            self.drag = DragState::Idle;
        }
    }

    /// Commit a box equal to an item's own time range.
    ///
    /// # Errors
    /// Rejected for external items; state is unchanged.
    pub fn set_box_from_item(&mut self, item: &ScheduledItem) -> Result<(), SelectionError> {
        let window = SelectionBox::from_item(item)?;
        self.drag = DragState::BoxCommitted { window };
        Ok(())
    }

    /// Open a context menu anchored to the committed box.
    ///
    /// Returns `false` (no transition) when no box is committed.
    pub fn open_context_menu(&mut self, at: ScreenPoint) -> bool {
        if let DragState::BoxCommitted { window } = self.drag {
            self.drag = DragState::ContextMenuOpen { window, at };
            true
        } else {
            false
        }
    }

    /// Dismiss the context menu, keeping the box committed.
    pub fn close_context_menu(&mut self) {
        if let DragState::ContextMenuOpen { window, .. } = self.drag {
            self.drag = DragState::BoxCommitted { window };
        }
    }

    // ── Selection commands ───────────────────────────────────────────

    /// Add or remove an item from the selection.
    ///
    /// Returns whether the item is selected after the call.
    ///
    /// # Errors
    /// Rejected for external items; selection is unchanged.
    pub fn toggle_select(&mut self, item: &ScheduledItem) -> Result<bool, SelectionError> {
        if item.external {
            return Err(SelectionError::ExternalItem {
                id: item.id.clone(),
            });
        }
        if self.selected.remove(&item.id) {
            Ok(false)
        } else {
            self.selected.insert(item.id.clone());
            Ok(true)
        }
    }

    /// Select every non-external item fully contained in the committed
    /// box, appended in the order given, skipping ids already selected.
    ///
    /// Returns the number of items added; 0 when no box is committed.
    pub fn select_all_in_box(&mut self, items: &[ScheduledItem]) -> usize {
        let Some(window) = self.committed_box() else {
            return 0;
        };
        let mut added = 0;
        for item in items {
            if item.external || !window.contains_item(item) {
                continue;
            }
            if self.selected.insert(item.id.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Empty the selection; drag/box state is untouched.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Clear everything (successful batch placement or view teardown).
    pub fn reset(&mut self) {
        self.drag = DragState::Idle;
        self.selected.clear();
    }
}
