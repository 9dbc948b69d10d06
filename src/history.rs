//! Per-image undo/redo history.
//!
//! History operates on full snapshots of one image's annotation set, never
//! on diffs. Each image owns an independent pair of stacks; switching the
//! active image simply switches which entry of the map is consulted, and
//! there is no separately mirrored "current" slice to fall out of sync.
//!
//! Recording is suppressed while a restore is being applied. The guard is a
//! synchronous flag scoped exactly around the restoration and its
//! persistence writes; there is no timer involved, so a fast follow-up user
//! action can never be swallowed and a slow restore can never leak
//! spurious entries.

use std::collections::HashMap;

use crate::constants::MAX_HISTORY_SIZE;
use crate::model::{Annotation, AnnotationId, ImageId};

/// A full, independent copy of one image's annotation set at a point in
/// time. The unit stored on the undo/redo stacks.
pub type Snapshot = Vec<Annotation>;

/// Undo/redo stacks for a single image.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    /// Pre-change snapshots, most recent last.
    past: Vec<Snapshot>,
    /// Snapshots undone from, most recently undone last.
    future: Vec<Snapshot>,
}

/// History engine covering every image, keyed by image id.
#[derive(Debug, Default)]
pub struct History {
    states: HashMap<ImageId, HistoryState>,
    /// Suppresses recording while a restore is in flight.
    restoring: bool,
    max_size: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_size(MAX_HISTORY_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            states: HashMap::new(),
            restoring: false,
            max_size,
        }
    }

    fn state_mut(&mut self, image_id: &str) -> &mut HistoryState {
        // Lazily created on first touch of an image
        self.states.entry(image_id.to_string()).or_default()
    }

    /// Record the pre-change snapshot of a user-initiated mutation.
    ///
    /// Clears the redo stack and evicts the oldest entry once the cap is
    /// exceeded. A no-op while a restore is being applied.
    pub fn record(&mut self, image_id: &str, pre_change: Snapshot) {
        if self.restoring {
            log::debug!("history: record suppressed during restore");
            return;
        }
        let max_size = self.max_size;
        let state = self.state_mut(image_id);
        state.past.push(pre_change);
        state.future.clear();
        while state.past.len() > max_size {
            state.past.remove(0);
        }
        log::debug!(
            "history: recorded change for {image_id} (depth {})",
            state.past.len()
        );
    }

    /// Pop the most recent pre-change snapshot for `image_id`.
    ///
    /// `current` is the live annotation set at the time of the undo; it is
    /// parked on the redo stack so the undone state can be re-applied.
    /// Returns the snapshot to restore, or `None` when there is nothing to
    /// undo (never an error).
    pub fn undo(&mut self, image_id: &str, current: Snapshot) -> Option<Snapshot> {
        let state = self.state_mut(image_id);
        let snapshot = state.past.pop()?;
        state.future.push(current);
        log::debug!("history: undo on {image_id}");
        Some(snapshot)
    }

    /// Pop the most recently undone snapshot for `image_id`.
    ///
    /// `current` is parked back on the undo stack. Returns the snapshot to
    /// restore, or `None` when there is nothing to redo.
    pub fn redo(&mut self, image_id: &str, current: Snapshot) -> Option<Snapshot> {
        let state = self.state_mut(image_id);
        let snapshot = state.future.pop()?;
        state.past.push(current);
        log::debug!("history: redo on {image_id}");
        Some(snapshot)
    }

    /// Put a popped snapshot back where it came from after a failed restore
    /// write, leaving the stacks consistent with the persisted state.
    pub(crate) fn rollback_undo(&mut self, image_id: &str, snapshot: Snapshot) {
        let state = self.state_mut(image_id);
        state.past.push(snapshot);
        state.future.pop();
    }

    /// Counterpart of [`Self::rollback_undo`] for a failed redo.
    pub(crate) fn rollback_redo(&mut self, image_id: &str, snapshot: Snapshot) {
        let state = self.state_mut(image_id);
        state.future.push(snapshot);
        state.past.pop();
    }

    pub fn can_undo(&self, image_id: &str) -> bool {
        self.states
            .get(image_id)
            .is_some_and(|s| !s.past.is_empty())
    }

    pub fn can_redo(&self, image_id: &str) -> bool {
        self.states
            .get(image_id)
            .is_some_and(|s| !s.future.is_empty())
    }

    pub fn undo_depth(&self, image_id: &str) -> usize {
        self.states.get(image_id).map_or(0, |s| s.past.len())
    }

    pub fn redo_depth(&self, image_id: &str) -> usize {
        self.states.get(image_id).map_or(0, |s| s.future.len())
    }

    /// Reset both stacks for one image (full data reset).
    pub fn clear(&mut self, image_id: &str) {
        if let Some(state) = self.states.get_mut(image_id) {
            state.past.clear();
            state.future.clear();
        }
        log::debug!("history: cleared for {image_id}");
    }

    /// Discard the history of a removed image.
    pub fn remove_image(&mut self, image_id: &str) {
        self.states.remove(image_id);
    }

    /// Whether a restore is currently being applied.
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Open the suppression window around a restore. Must be paired with
    /// [`Self::end_restore`] once the dependent persistence writes return.
    pub(crate) fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub(crate) fn end_restore(&mut self) {
        self.restoring = false;
    }
}

/// Difference between a snapshot and the live annotation set.
///
/// A snapshot is the complete authoritative state for its image: everything
/// in it is upserted, and live annotations absent from it are deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestorePlan {
    /// Annotations to insert or update.
    pub upserts: Vec<Annotation>,
    /// Ids of live annotations not present in the snapshot.
    pub deletions: Vec<AnnotationId>,
}

/// Compute the write set needed to make `live` equal to `snapshot`.
pub fn restore_plan(live: &[Annotation], snapshot: &[Annotation]) -> RestorePlan {
    let deletions = live
        .iter()
        .filter(|ann| !snapshot.iter().any(|s| s.id == ann.id))
        .map(|ann| ann.id.clone())
        .collect();
    RestorePlan {
        upserts: snapshot.to_vec(),
        deletions,
    }
}
