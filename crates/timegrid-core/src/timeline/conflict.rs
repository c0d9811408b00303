//! Temporal conflict detection between same-day items.
//!
//! Classifies each item of a day as overlapping, inside the tolerance
//! window of a neighbour, or clear. Overlap has strict priority over a
//! tolerance warning, and a zero-minute gap counts as a tolerance
//! violation, not an overlap.

use std::collections::BTreeSet;

use tracing::debug;

use super::item::{ConflictState, ScheduledItem};

/// Default minimum acceptable gap between two non-overlapping items.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 15;

/// Detector for temporal conflicts within one rendered day.
///
/// Items are assumed pre-filtered to a single calendar day; cross-day
/// conflicts are not considered. The pairwise O(n²) scan is fine for a
/// single day's item count.
pub struct ConflictDetector {
    /// Minimum acceptable gap (in minutes) before a warning is raised
    tolerance_minutes: i64,
}

impl ConflictDetector {
    /// Create a new detector with the default tolerance.
    pub fn new() -> Self {
        Self {
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
        }
    }

    /// Set the tolerance window in minutes.
    pub fn with_tolerance(mut self, minutes: i64) -> Self {
        self.tolerance_minutes = minutes.max(0);
        self
    }

    /// Annotate every item's conflict state in place.
    pub fn annotate(&self, items: &mut [ScheduledItem]) {
        for index in 0..items.len() {
            items[index].conflict_state = self.classify(index, items);
        }
        debug!(
            items = items.len(),
            overlaps = items
                .iter()
                .filter(|i| i.conflict_state == ConflictState::Overlap)
                .count(),
            warnings = items
                .iter()
                .filter(|i| i.conflict_state == ConflictState::ToleranceWarning)
                .count(),
            tolerance_minutes = self.tolerance_minutes,
            "conflict detection pass"
        );
    }

    /// Classify a single item against every other item in the set.
    fn classify(&self, index: usize, items: &[ScheduledItem]) -> ConflictState {
        let item = &items[index];
        let mut within_tolerance = false;

        for (other_index, other) in items.iter().enumerate() {
            if other_index == index {
                continue;
            }

            // Overlap short-circuits: it outranks any warning from a third item.
            if item.overlaps(other) {
                return ConflictState::Overlap;
            }

            if let Some(gap) = Self::adjacent_gap_minutes(item, other) {
                if gap < self.tolerance_minutes {
                    within_tolerance = true;
                }
            }
        }

        if within_tolerance {
            ConflictState::ToleranceWarning
        } else {
            ConflictState::NoConflict
        }
    }

    /// Minutes between two non-overlapping items on whichever side is
    /// adjacent, or `None` when the pair overlaps.
    ///
    /// A zero gap (touching endpoints) is a real gap of 0 minutes.
    fn adjacent_gap_minutes(item: &ScheduledItem, other: &ScheduledItem) -> Option<i64> {
        let gap_before = if item.start_time >= other.end_time {
            Some((item.start_time - other.end_time).num_minutes())
        } else {
            None
        };
        let gap_after = if other.start_time >= item.end_time {
            Some((other.start_time - item.end_time).num_minutes())
        } else {
            None
        };

        match (gap_before, gap_after) {
            (Some(before), Some(after)) => Some(before.min(after)),
            (Some(before), None) => Some(before),
            (None, Some(after)) => Some(after),
            (None, None) => None,
        }
    }

    /// Return copies of the items that would be flagged with a tolerance
    /// warning, without mutating the input.
    pub fn tolerance_warnings(&self, items: &[ScheduledItem]) -> Vec<ScheduledItem> {
        let mut scratch = items.to_vec();
        self.annotate(&mut scratch);
        scratch
            .into_iter()
            .filter(|i| i.conflict_state == ConflictState::ToleranceWarning)
            .collect()
    }

    /// Every overlapping pair, canonicalized by ascending id.
    pub fn overlapping_pairs(items: &[ScheduledItem]) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();
        for (i, a) in items.iter().enumerate() {
            for b in items.iter().skip(i + 1) {
                if a.overlaps(b) {
                    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
                    pairs.insert((first.id.clone(), second.id.clone()));
                }
            }
        }
        pairs
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to annotate a snapshot with a given tolerance.
pub fn detect_conflicts(mut items: Vec<ScheduledItem>, tolerance_minutes: i64) -> Vec<ScheduledItem> {
    ConflictDetector::new()
        .with_tolerance(tolerance_minutes)
        .annotate(&mut items);
    items
}
