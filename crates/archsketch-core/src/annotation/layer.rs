//! The annotation layer: engine handle, snapshot history and save timing.

use super::{
    AnnotationEngine, AnnotationError, AnnotationHistory, CanvasState, Debouncer,
    DisabledAnnotationEngine, EngineSignal, RestoreFuture,
};
use crate::config::HistoryConfig;
use crate::input::PointerEvent;
use crate::storage::AnnotationRecord;
use crate::tools::AnnotationTool;
use kurbo::Point;
use std::task::{Context, Waker};
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// How a history snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Snapshot now, dropping any pending debounced save.
    Immediate,
    /// Snapshot once no further save was requested for this long.
    Debounced(Duration),
}

struct PendingRestore {
    future: RestoreFuture,
    started: Instant,
}

/// Owns the annotation engine together with its undo/redo history.
pub struct AnnotationLayer {
    engine: Box<dyn AnnotationEngine>,
    history: AnnotationHistory,
    debouncer: Debouncer,
    pending_restore: Option<PendingRestore>,
    restore_timeout: Duration,
    degraded: bool,
}

impl Default for AnnotationLayer {
    fn default() -> Self {
        Self::new(Box::new(DisabledAnnotationEngine), &HistoryConfig::default())
    }
}

impl AnnotationLayer {
    pub fn new(engine: Box<dyn AnnotationEngine>, config: &HistoryConfig) -> Self {
        Self {
            engine,
            history: AnnotationHistory::new(config.limit),
            debouncer: Debouncer::new(config.debounce),
            pending_restore: None,
            restore_timeout: config.restore_timeout,
            degraded: false,
        }
    }

    /// Build from the outcome of engine initialisation.
    ///
    /// If the engine could not be created the layer runs with
    /// [`DisabledAnnotationEngine`] and diagram editing is unaffected.
    pub fn from_init(
        engine: Result<Box<dyn AnnotationEngine>, AnnotationError>,
        config: &HistoryConfig,
    ) -> Self {
        match engine {
            Ok(engine) => Self::new(engine, config),
            Err(e) => {
                log::warn!("{}; annotations disabled", e);
                let mut layer = Self::new(Box::new(DisabledAnnotationEngine), config);
                layer.degraded = true;
                layer
            }
        }
    }

    /// Whether the layer fell back to the disabled engine.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn history(&self) -> &AnnotationHistory {
        &self.history
    }

    pub fn engine(&self) -> &dyn AnnotationEngine {
        self.engine.as_ref()
    }

    /// Whether a restore is still loading into the engine.
    pub fn is_restoring(&self) -> bool {
        self.pending_restore.is_some()
    }

    pub fn set_tool(&mut self, tool: AnnotationTool) {
        self.engine.set_tool(tool);
    }

    /// Forward pointer input to the engine and record the outcome.
    pub fn pointer(&mut self, event: &PointerEvent, canvas: Point, now: Instant) -> EngineSignal {
        let signal = self.engine.pointer(event, canvas);
        match signal {
            EngineSignal::None => {}
            EngineSignal::Modified => self.save(SaveMode::Debounced(self.debouncer.delay()), now),
            EngineSignal::Finished => self.save(SaveMode::Immediate, now),
        }
        signal
    }

    /// Append the engine's current state to the history.
    pub fn save(&mut self, mode: SaveMode, now: Instant) {
        if self.history.is_loading() {
            return;
        }
        match mode {
            SaveMode::Immediate => {
                self.debouncer.cancel();
                self.history.record(self.engine.snapshot());
            }
            SaveMode::Debounced(delay) => self.debouncer.schedule_after(now, delay),
        }
    }

    /// Fire a due debounced save and advance a pending restore.
    ///
    /// Returns true if a snapshot was recorded.
    pub fn tick(&mut self, now: Instant) -> bool {
        let recorded = self.debouncer.fire(now)
            && !self.history.is_loading()
            && self.history.record(self.engine.snapshot());
        self.poll_restore(now);
        recorded
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        if self.is_restoring() {
            log::debug!("Undo ignored while restoring");
            return false;
        }
        match self.history.undo() {
            Some(state) => {
                self.begin_restore(state, now);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        if self.is_restoring() {
            log::debug!("Redo ignored while restoring");
            return false;
        }
        match self.history.redo() {
            Some(state) => {
                self.begin_restore(state, now);
                true
            }
            None => false,
        }
    }

    /// Remove the engine's selected objects, snapshotting if any were removed.
    pub fn delete_selection(&mut self, now: Instant) -> bool {
        let removed = self.engine.delete_selection();
        if removed {
            self.save(SaveMode::Immediate, now);
        }
        removed
    }

    /// Drop the object being drawn or selected.
    pub fn discard_active(&mut self) {
        self.engine.discard_active();
    }

    /// Remove all annotations as a new undoable step.
    pub fn clear(&mut self, now: Instant) {
        self.engine.clear();
        self.save(SaveMode::Immediate, now);
    }

    pub fn export(&self) -> AnnotationRecord {
        self.history.export()
    }

    /// Replace the history and load its current snapshot into the engine.
    pub fn import(&mut self, record: AnnotationRecord, now: Instant) {
        self.debouncer.cancel();
        self.pending_restore = None;
        self.history.import(record);
        match self.history.current().cloned() {
            Some(state) => self.begin_restore(state, now),
            None => self.engine.clear(),
        }
    }

    fn begin_restore(&mut self, state: CanvasState, now: Instant) {
        self.debouncer.cancel();
        self.history.set_loading(true);
        let future = self.engine.restore(state);
        self.pending_restore = Some(PendingRestore {
            future,
            started: now,
        });
        self.poll_restore(now);
    }

    fn poll_restore(&mut self, now: Instant) {
        let Some(pending) = &mut self.pending_restore else {
            return;
        };
        let mut cx = Context::from_waker(Waker::noop());
        let done = pending.future.as_mut().poll(&mut cx).is_ready();
        let timed_out = !done && now.saturating_duration_since(pending.started) >= self.restore_timeout;
        if timed_out {
            log::warn!(
                "Annotation restore exceeded {:?}; continuing",
                self.restore_timeout
            );
        }
        if done || timed_out {
            self.pending_restore = None;
            self.history.set_loading(false);
        }
    }
}
