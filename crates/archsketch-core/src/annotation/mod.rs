//! Annotation overlay: the drawing-engine contract and its undo history.
//!
//! The vector-drawing engine is external. The editor talks to it through
//! [`AnnotationEngine`] and keeps only the snapshot history and the active
//! tool on its side.

mod debounce;
mod history;
mod layer;

pub use debounce::Debouncer;
pub use history::AnnotationHistory;
pub use layer::{AnnotationLayer, SaveMode};

use crate::input::PointerEvent;
use crate::tools::AnnotationTool;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::future::{Future, ready};
use std::pin::Pin;
use thiserror::Error;

/// Version tag of snapshots produced by the engine.
pub const CANVAS_STATE_VERSION: &str = "1.0";

/// Annotation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("Annotation engine unavailable: {0}")]
    Unavailable(String),
}

/// Opaque snapshot of the annotation canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    pub version: String,
    /// Engine-defined object records.
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,
}

impl CanvasState {
    /// A canvas with no objects.
    pub fn empty() -> Self {
        Self {
            version: CANVAS_STATE_VERSION.to_string(),
            objects: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Completion of an asynchronous restore.
pub type RestoreFuture = Pin<Box<dyn Future<Output = ()>>>;

/// What the engine reports after handling a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineSignal {
    #[default]
    None,
    /// Objects changed but the current shape is still in progress.
    Modified,
    /// A shape, stroke or text entry was committed.
    Finished,
}

/// Capability handle to the vector-drawing engine.
pub trait AnnotationEngine {
    /// Serialize the current object set.
    fn snapshot(&self) -> CanvasState;

    /// Load a snapshot. The returned future completes once loading is done.
    fn restore(&mut self, state: CanvasState) -> RestoreFuture;

    /// Remove every object.
    fn clear(&mut self);

    /// Switch the drawing tool.
    fn set_tool(&mut self, tool: AnnotationTool);

    /// Handle pointer input at the given canvas position.
    fn pointer(&mut self, event: &PointerEvent, canvas: Point) -> EngineSignal;

    /// Remove the selected objects. Returns true if anything was removed.
    fn delete_selection(&mut self) -> bool {
        false
    }

    /// Drop the in-progress or selected object without committing it.
    fn discard_active(&mut self) {}
}

/// No-op engine used when the real one fails to initialise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnnotationEngine;

impl AnnotationEngine for DisabledAnnotationEngine {
    fn snapshot(&self) -> CanvasState {
        CanvasState::empty()
    }

    fn restore(&mut self, _state: CanvasState) -> RestoreFuture {
        Box::pin(ready(()))
    }

    fn clear(&mut self) {}

    fn set_tool(&mut self, _tool: AnnotationTool) {}

    fn pointer(&mut self, _event: &PointerEvent, _canvas: Point) -> EngineSignal {
        EngineSignal::None
    }
}
