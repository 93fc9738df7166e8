//! ArchSketch Core Library
//!
//! Platform-agnostic viewport, interaction, simulation and persistence logic for the
//! ArchSketch system-design diagram editor.

pub mod annotation;
pub mod config;
pub mod coords;
pub mod editor;
pub mod graph;
pub mod input;
pub mod interaction;
pub mod simulation;
pub mod storage;
pub mod tools;
pub mod viewport;

pub use annotation::{
    AnnotationEngine, AnnotationError, AnnotationHistory, AnnotationLayer, CanvasState,
    DisabledAnnotationEngine, EngineSignal, SaveMode,
};
pub use config::{ConfigError, EditorConfig};
pub use coords::CoordinateConverter;
pub use editor::{Editor, SessionSettings};
pub use graph::{DiagramGraph, Edge, EdgeId, GraphStore, Node, NodeId, NodeTemplate, Selection};
pub use input::{HitPath, KeyCommand, Modifiers, MouseButton, PointerEvent, Target, TouchEvent, WheelEvent};
pub use interaction::{InteractionEvent, InteractionMachine, InteractionMode, ModeKind};
pub use simulation::{LoadLevel, LoadReport, ServerStatus};
pub use tools::AnnotationTool;
pub use viewport::{Transform, Viewport, ViewportError};
