//! Bounded undo/redo history of annotation snapshots.

use super::CanvasState;
use crate::config::HISTORY_LIMIT;
use crate::storage::AnnotationRecord;

/// Append-trim stack of canvas snapshots with a movable cursor.
///
/// `index` is `None` before the first entry, which is where undo lands when
/// it steps past the oldest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationHistory {
    states: Vec<CanvasState>,
    index: Option<usize>,
    limit: usize,
    /// Set while a snapshot is being restored into the engine.
    loading: bool,
}

impl Default for AnnotationHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl AnnotationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            states: Vec::new(),
            index: None,
            limit: limit.max(1),
            loading: false,
        }
    }

    /// Record a snapshot as the newest entry.
    ///
    /// Any redo tail is discarded and the oldest entries are dropped beyond
    /// the limit. Returns false if a restore is in progress.
    pub fn record(&mut self, state: CanvasState) -> bool {
        if self.loading {
            log::debug!("Snapshot ignored while restoring history");
            return false;
        }
        self.states.truncate(self.index.map_or(0, |i| i + 1));
        self.states.push(state);
        if self.states.len() > self.limit {
            let excess = self.states.len() - self.limit;
            self.states.drain(..excess);
        }
        self.index = Some(self.states.len() - 1);
        true
    }

    /// Step back one entry and return the state to restore.
    pub fn undo(&mut self) -> Option<CanvasState> {
        match self.index? {
            0 => {
                self.index = None;
                Some(CanvasState::empty())
            }
            i => {
                self.index = Some(i - 1);
                Some(self.states[i - 1].clone())
            }
        }
    }

    /// Step forward one entry and return the state to restore.
    pub fn redo(&mut self) -> Option<CanvasState> {
        let next = self.index.map_or(0, |i| i + 1);
        let state = self.states.get(next)?.clone();
        self.index = Some(next);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.index.map_or(0, |i| i + 1) < self.states.len()
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> Option<&CanvasState> {
        self.states.get(self.index?)
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.index = None;
    }

    pub fn export(&self) -> AnnotationRecord {
        AnnotationRecord {
            canvas_state_history: self.states.clone(),
            history_index: self.index.map_or(-1, |i| i as i64),
        }
    }

    /// Replace the history with a persisted record.
    ///
    /// An out-of-range index is clamped to the newest entry; records longer
    /// than the limit keep their newest entries.
    pub fn import(&mut self, record: AnnotationRecord) {
        let mut states = record.canvas_state_history;
        let mut index = usize::try_from(record.history_index)
            .ok()
            .filter(|_| !states.is_empty())
            .map(|i| i.min(states.len() - 1));

        if states.len() > self.limit {
            let excess = states.len() - self.limit;
            states.drain(..excess);
            index = index.and_then(|i| i.checked_sub(excess));
        }

        self.states = states;
        self.index = index;
        self.loading = false;
    }
}
