//! Serialisable records persisted through [`Storage`](super::Storage).

use crate::annotation::CanvasState;
use crate::graph::{Edge, Node};
use crate::viewport::Transform;
use serde::{Deserialize, Serialize};

/// Storage key of the diagram workspace.
pub const WORKSPACE_KEY: &str = "archsketch.workspace";

/// Storage key of the annotation history.
pub const ANNOTATIONS_KEY: &str = "archsketch.annotations";

fn default_simulation_rate() -> u32 {
    1
}

/// Persisted part of the diagram workspace.
///
/// Selection, drag offsets, pending connections and the interaction mode are
/// transient and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceRecord {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub canvas_transform: Transform,
    /// Simulated requests per second.
    #[serde(default = "default_simulation_rate")]
    pub simulation_rate: u32,
    pub run_flag: bool,
    pub fullscreen: bool,
}

impl Default for WorkspaceRecord {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            canvas_transform: Transform::default(),
            simulation_rate: default_simulation_rate(),
            run_flag: false,
            fullscreen: false,
        }
    }
}

/// Persisted annotation undo/redo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationRecord {
    pub canvas_state_history: Vec<CanvasState>,
    /// Index of the current snapshot, `-1` when nothing is recorded.
    pub history_index: i64,
}

impl Default for AnnotationRecord {
    fn default() -> Self {
        Self {
            canvas_state_history: Vec::new(),
            history_index: -1,
        }
    }
}
