//! Input events for mouse/touch/keyboard interaction.
//!
//! All positions are in client space. The host hit-tests the pointer and
//! passes the resulting [`HitPath`] along with pointer-down and touch-start
//! events.

use crate::graph::{EdgeId, NodeId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl or Cmd held. Trackpad pinches arrive as ctrl+wheel.
    pub fn zoom_gesture(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// An element under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Empty canvas background.
    Canvas,
    /// A node body.
    Node(NodeId),
    /// The output (source) port of a node.
    OutputPort(NodeId),
    /// The input (target) port of a node.
    InputPort(NodeId),
    /// An edge path.
    Edge(EdgeId),
    /// Dock or toolbar control.
    Dock,
    /// Editor header.
    Header,
    /// Any element explicitly marked as not starting a pan.
    NoPan,
}

impl Target {
    /// Whether a pointer-down on this element must not start a pan.
    pub fn is_interactive(&self) -> bool {
        match self {
            Target::Canvas | Target::Edge(_) => false,
            Target::Node(_)
            | Target::OutputPort(_)
            | Target::InputPort(_)
            | Target::Dock
            | Target::Header
            | Target::NoPan => true,
        }
    }

    /// The node this element belongs to, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Target::Node(id) | Target::OutputPort(id) | Target::InputPort(id) => Some(id),
            _ => None,
        }
    }
}

/// Hit-test result, innermost element first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPath(Vec<Target>);

impl HitPath {
    pub fn new(path: Vec<Target>) -> Self {
        Self(path)
    }

    /// Path consisting of the bare canvas.
    pub fn canvas() -> Self {
        Self(vec![Target::Canvas])
    }

    /// Path for an element sitting directly on the canvas.
    pub fn on_canvas(target: Target) -> Self {
        Self(vec![target, Target::Canvas])
    }

    /// Innermost element under the pointer.
    pub fn innermost(&self) -> Option<&Target> {
        self.0.first()
    }

    /// True if any element from the innermost up to the root is interactive.
    pub fn is_interactive(&self) -> bool {
        self.0.iter().any(Target::is_interactive)
    }

    /// First port on the path, if the pointer is over one.
    pub fn port(&self) -> Option<&Target> {
        self.0
            .iter()
            .find(|t| matches!(t, Target::OutputPort(_) | Target::InputPort(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.0.iter()
    }
}

/// Pointer event type for unified mouse/pen handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        path: HitPath,
    },
    Up {
        position: Point,
        path: HitPath,
    },
    Move {
        position: Point,
    },
    /// Pointer left the canvas container.
    Leave,
}

impl PointerEvent {
    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => Some(*position),
            PointerEvent::Leave => None,
        }
    }
}

/// Wheel/trackpad scroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub position: Point,
    pub delta: Vec2,
    pub modifiers: Modifiers,
}

/// Touch events carrying the positions of all active touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TouchEvent {
    Start { touches: Vec<Point>, path: HitPath },
    Move { touches: Vec<Point> },
    /// `path` is the hit path under the lifted finger.
    End { remaining: Vec<Point>, path: HitPath },
}

/// Distance between the first two touches, if at least two are active.
pub fn touch_distance(touches: &[Point]) -> Option<f64> {
    match touches {
        [a, b, ..] => Some(a.distance(*b)),
        _ => None,
    }
}

/// Editor-level keyboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCommand {
    /// Escape: abandon the current gesture.
    Cancel,
    /// Delete/Backspace: remove the selected edge or node.
    Delete,
    Undo,
    Redo,
}

impl KeyCommand {
    /// Map a DOM-style key name plus modifiers to a command.
    pub fn from_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        let cmd = modifiers.ctrl || modifiers.meta;
        match key {
            "Escape" => Some(KeyCommand::Cancel),
            "Delete" | "Backspace" if !cmd => Some(KeyCommand::Delete),
            "z" | "Z" if cmd && modifiers.shift => Some(KeyCommand::Redo),
            "z" | "Z" if cmd => Some(KeyCommand::Undo),
            "y" | "Y" if cmd => Some(KeyCommand::Redo),
            _ => None,
        }
    }
}
