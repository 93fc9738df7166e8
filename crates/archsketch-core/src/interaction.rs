//! Pointer interaction state machine.
//!
//! One [`InteractionMode`] is active at a time. Every event handler matches on
//! it once and either updates the viewport (pan/zoom), moves a node, builds a
//! pending connection, or hands the event to the annotation layer.

use crate::config::{EditorConfig, NodeGeometry};
use crate::coords::CoordinateConverter;
use crate::graph::{EdgeId, GraphStore, NodeId, Selection, output_port};
use crate::input::{
    HitPath, KeyCommand, MouseButton, PointerEvent, Target, TouchEvent, WheelEvent, touch_distance,
};
use crate::tools::AnnotationTool;
use crate::viewport::{Transform, Viewport};
use kurbo::{Line, Point, Vec2};

/// The current state of user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionMode {
    /// No active interaction.
    Idle,
    /// User is panning the canvas.
    Panning {
        /// Pointer position at gesture start (client space).
        start_pointer: Point,
        /// Transform at gesture start.
        start_transform: Transform,
    },
    /// User is moving a node.
    DraggingNode {
        node: NodeId,
        /// Pointer position relative to the node centre, in canvas space.
        grab_offset: Vec2,
        /// Node centre when the drag started.
        origin: Point,
        start_pointer: Point,
        /// Whether the pointer has travelled beyond the drag threshold.
        moved: bool,
    },
    /// User is drawing a connection from an output port.
    Connecting {
        source: NodeId,
        /// Output port the rubber band starts at (canvas space).
        anchor: Point,
        /// Free end of the rubber band (canvas space).
        cursor: Point,
        /// Offset keeping the free end at the anchor until the pointer moves.
        compensation: Vec2,
    },
    /// An annotation tool owns pointer input.
    Annotating(AnnotationTool),
}

/// Discriminant of [`InteractionMode`], for reporting transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Idle,
    Panning,
    DraggingNode,
    Connecting,
    Annotating,
}

impl InteractionMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            InteractionMode::Idle => ModeKind::Idle,
            InteractionMode::Panning { .. } => ModeKind::Panning,
            InteractionMode::DraggingNode { .. } => ModeKind::DraggingNode,
            InteractionMode::Connecting { .. } => ModeKind::Connecting,
            InteractionMode::Annotating(_) => ModeKind::Annotating,
        }
    }
}

/// Events emitted to the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    ModeChanged(ModeKind),
    ViewportChanged(Transform),
    /// A node drag finished with the pointer having actually moved.
    NodeMoved { node: NodeId, from: Point, to: Point },
    EdgeCreated(EdgeId),
    /// A pending connection ended without creating an edge.
    ConnectionDiscarded { source: NodeId },
    SelectionChanged(Selection),
    ToolChanged(AnnotationTool),
    /// Pointer input for the annotation engine, with the canvas position.
    ForwardToAnnotation { event: PointerEvent, canvas: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pinch {
    initial_distance: f64,
    initial_scale: f64,
}

/// Mutable collaborators an event handler works on.
pub struct Context<'a, S: GraphStore + ?Sized> {
    pub viewport: &'a mut Viewport,
    pub coords: &'a CoordinateConverter,
    pub store: &'a mut S,
}

/// Pointer interaction state machine.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    mode: InteractionMode,
    pinch: Option<Pinch>,
    /// Set when a node drag ends; suppresses the next background click-clear.
    drag_just_completed: bool,
    last_touch: Option<Point>,
    geometry: NodeGeometry,
    drag_threshold: f64,
    zoom_sensitivity: f64,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl InteractionMachine {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            mode: InteractionMode::Idle,
            pinch: None,
            drag_just_completed: false,
            last_touch: None,
            geometry: config.nodes,
            drag_threshold: config.interaction.drag_threshold,
            zoom_sensitivity: config.viewport.zoom_sensitivity,
        }
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// Active annotation tool (`Select` unless annotating).
    pub fn tool(&self) -> AnnotationTool {
        match self.mode {
            InteractionMode::Annotating(tool) => tool,
            _ => AnnotationTool::Select,
        }
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    pub fn drag_just_completed(&self) -> bool {
        self.drag_just_completed
    }

    /// Rubber band from the source port to the cursor while connecting.
    pub fn rubber_band(&self) -> Option<Line> {
        match self.mode {
            InteractionMode::Connecting { anchor, cursor, .. } => Some(Line::new(anchor, cursor)),
            _ => None,
        }
    }

    /// Drop all transient state. Used when the workspace is reloaded.
    pub fn reset(&mut self) {
        self.mode = InteractionMode::Idle;
        self.pinch = None;
        self.drag_just_completed = false;
        self.last_touch = None;
    }

    fn set_mode(&mut self, mode: InteractionMode, events: &mut Vec<InteractionEvent>) {
        let (from, to) = (self.mode.kind(), mode.kind());
        self.mode = mode;
        if from != to {
            log::debug!("Interaction mode {:?} -> {:?}", from, to);
            events.push(InteractionEvent::ModeChanged(to));
        }
    }

    /// Handle a pointer event.
    pub fn pointer<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        event: &PointerEvent,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();

        if let InteractionMode::Annotating(_) = self.mode {
            if let PointerEvent::Down { .. } = event {
                self.drag_just_completed = false;
            }
            if let Some(position) = event.position() {
                let canvas = ctx.coords.to_canvas(&ctx.viewport.transform(), position);
                events.push(InteractionEvent::ForwardToAnnotation {
                    event: event.clone(),
                    canvas,
                });
            }
            return events;
        }

        match event {
            PointerEvent::Down {
                position,
                button,
                path,
            } => {
                self.drag_just_completed = false;
                self.pointer_down(ctx, *position, *button, path, &mut events);
            }
            PointerEvent::Move { position } => self.pointer_move(ctx, *position, &mut events),
            PointerEvent::Up { path, .. } => self.pointer_up(ctx, Some(path), &mut events),
            PointerEvent::Leave => self.pointer_up(ctx, None, &mut events),
        }
        events
    }

    fn pointer_down<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        position: Point,
        button: MouseButton,
        path: &HitPath,
        events: &mut Vec<InteractionEvent>,
    ) {
        if self.mode != InteractionMode::Idle {
            log::debug!("Ignoring pointer down while {:?}", self.mode.kind());
            return;
        }
        if self.pinch.is_some() {
            return;
        }

        let transform = ctx.viewport.transform();
        let canvas = ctx.coords.to_canvas(&transform, position);

        if button == MouseButton::Left {
            // Ports take priority over the node body they sit on.
            if let Some(Target::OutputPort(source)) = path.port() {
                if let Some(node) = ctx.store.node(source) {
                    let anchor = output_port(node, &self.geometry);
                    let mode = InteractionMode::Connecting {
                        source: source.clone(),
                        anchor,
                        cursor: anchor,
                        compensation: anchor - canvas,
                    };
                    self.set_mode(mode, events);
                }
                return;
            }
            if path.port().is_some() {
                return;
            }

            let hit_node = path.iter().find_map(|t| match t {
                Target::Node(id) => Some(id),
                _ => None,
            });
            if let Some(id) = hit_node {
                if let Some(node) = ctx.store.node(id) {
                    let origin = node.center();
                    let mode = InteractionMode::DraggingNode {
                        node: id.clone(),
                        grab_offset: canvas - origin,
                        origin,
                        start_pointer: position,
                        moved: false,
                    };
                    self.set_mode(mode, events);
                }
                return;
            }
        }

        if button != MouseButton::Right && !path.is_interactive() {
            let mode = InteractionMode::Panning {
                start_pointer: position,
                start_transform: transform,
            };
            self.set_mode(mode, events);
        }
    }

    fn pointer_move<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        position: Point,
        events: &mut Vec<InteractionEvent>,
    ) {
        let threshold = self.drag_threshold;
        match &mut self.mode {
            InteractionMode::Idle | InteractionMode::Annotating(_) => {}
            InteractionMode::Panning {
                start_pointer,
                start_transform,
            } => {
                let before = ctx.viewport.transform();
                ctx.viewport.pan_from(*start_transform, position - *start_pointer);
                push_viewport_change(ctx.viewport, before, events);
            }
            InteractionMode::DraggingNode {
                node,
                grab_offset,
                start_pointer,
                moved,
                ..
            } => {
                let canvas = ctx.coords.to_canvas(&ctx.viewport.transform(), position);
                if !ctx.store.update_node_position(node, canvas - *grab_offset) {
                    log::debug!("Dragged node {} disappeared", node);
                    self.set_mode(InteractionMode::Idle, events);
                    return;
                }
                if position.distance(*start_pointer) > threshold {
                    *moved = true;
                }
            }
            InteractionMode::Connecting {
                cursor,
                compensation,
                ..
            } => {
                let canvas = ctx.coords.to_canvas(&ctx.viewport.transform(), position);
                *cursor = canvas + *compensation;
            }
        }
    }

    /// Pointer released (`path` is `None` when the pointer left the canvas).
    fn pointer_up<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        path: Option<&HitPath>,
        events: &mut Vec<InteractionEvent>,
    ) {
        let ended = self.mode.kind();
        match std::mem::replace(&mut self.mode, InteractionMode::Idle) {
            InteractionMode::Idle => {}
            InteractionMode::Annotating(tool) => self.mode = InteractionMode::Annotating(tool),
            InteractionMode::Panning { .. } => self.ended(ended, events),
            InteractionMode::DraggingNode {
                node, origin, moved, ..
            } => {
                self.drag_just_completed = true;
                self.ended(ended, events);
                if !moved {
                    // Jitter below the threshold is not a move; put the node back.
                    ctx.store.update_node_position(&node, origin);
                }
                let to = ctx.store.node(&node).map(|n| n.center());
                if let (true, Some(to)) = (moved, to) {
                    events.push(InteractionEvent::NodeMoved {
                        node,
                        from: origin,
                        to,
                    });
                }
            }
            InteractionMode::Connecting { source, .. } => {
                let target = path.and_then(|p| {
                    p.iter().find_map(|t| match t {
                        Target::InputPort(id) => Some(id),
                        _ => None,
                    })
                });
                let created = match target {
                    Some(target) if target != &source => ctx.store.add_edge(&source, target),
                    _ => None,
                };
                self.ended(ended, events);
                match created {
                    Some(edge) => {
                        log::debug!("Connected {} via {}", source, edge);
                        events.push(InteractionEvent::EdgeCreated(edge));
                    }
                    None => events.push(InteractionEvent::ConnectionDiscarded { source }),
                }
            }
        }
    }

    /// Report a gesture that has already returned to `Idle`.
    fn ended(&self, from: ModeKind, events: &mut Vec<InteractionEvent>) {
        log::debug!("Interaction mode {:?} -> {:?}", from, ModeKind::Idle);
        events.push(InteractionEvent::ModeChanged(ModeKind::Idle));
    }

    /// Handle a wheel event. Only zoom gestures on the idle select tool zoom.
    pub fn wheel<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        event: &WheelEvent,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        if self.mode != InteractionMode::Idle || !event.modifiers.zoom_gesture() {
            return events;
        }
        let before = ctx.viewport.transform();
        let factor = 1.0 - event.delta.y * self.zoom_sensitivity;
        // Large deltas push the factor to zero or below; clamp rather than reject.
        ctx.viewport.zoom_to(ctx.viewport.clamp_scale(before.scale * factor));
        push_viewport_change(ctx.viewport, before, &mut events);
        events
    }

    /// Handle a touch event. Two fingers pinch-zoom, one finger acts as a pointer.
    pub fn touch<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        event: &TouchEvent,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        match event {
            TouchEvent::Start { touches, path } => match touches.as_slice() {
                [single] => {
                    self.last_touch = Some(*single);
                    let down = PointerEvent::Down {
                        position: *single,
                        button: MouseButton::Left,
                        path: path.clone(),
                    };
                    events = self.pointer(ctx, &down);
                }
                _ if touches.len() >= 2 => {
                    if path.is_interactive() || self.tool() != AnnotationTool::Select {
                        return events;
                    }
                    match self.mode.kind() {
                        ModeKind::Idle => {}
                        ModeKind::Panning => self.set_mode(InteractionMode::Idle, &mut events),
                        kind => {
                            log::debug!("Ignoring pinch start while {:?}", kind);
                            return events;
                        }
                    }
                    if let Some(distance) = touch_distance(touches) {
                        self.pinch = Some(Pinch {
                            initial_distance: distance,
                            initial_scale: ctx.viewport.scale(),
                        });
                    }
                }
                _ => {}
            },
            TouchEvent::Move { touches } => match touches.as_slice() {
                [single] => {
                    if self.pinch.is_none() {
                        self.last_touch = Some(*single);
                        events = self.pointer(ctx, &PointerEvent::Move { position: *single });
                    }
                }
                _ => {
                    let (Some(pinch), Some(distance)) = (self.pinch, touch_distance(touches)) else {
                        return events;
                    };
                    if pinch.initial_distance > 0.0 {
                        let before = ctx.viewport.transform();
                        ctx.viewport
                            .zoom_to(pinch.initial_scale * distance / pinch.initial_distance);
                        push_viewport_change(ctx.viewport, before, &mut events);
                    }
                }
            },
            TouchEvent::End { remaining, path } => match remaining.len() {
                0 => {
                    self.pinch = None;
                    if let Some(position) = self.last_touch.take() {
                        if self.mode.kind() != ModeKind::Idle {
                            let up = PointerEvent::Up {
                                position,
                                path: path.clone(),
                            };
                            events = self.pointer(ctx, &up);
                        }
                    }
                }
                1 => {
                    if let Some(pinch) = &mut self.pinch {
                        pinch.initial_distance = 0.0;
                    }
                }
                _ => {}
            },
        }
        events
    }

    /// Handle a click (pointer down and up on the same element).
    pub fn click<S: GraphStore + ?Sized>(&mut self, store: &mut S, path: &HitPath) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        if self.mode != InteractionMode::Idle {
            return events;
        }
        let before = store.selection().clone();
        match path.innermost() {
            Some(Target::Node(id) | Target::OutputPort(id) | Target::InputPort(id)) => {
                store.set_selected_node(Some(id.clone()));
            }
            Some(Target::Edge(id)) => store.set_selected_edge(Some(id.clone())),
            Some(Target::Canvas) => {
                if self.drag_just_completed {
                    self.drag_just_completed = false;
                    return events;
                }
                store.clear_selection();
            }
            Some(Target::Dock | Target::Header | Target::NoPan) | None => return events,
        }
        if store.selection() != &before {
            events.push(InteractionEvent::SelectionChanged(store.selection().clone()));
        }
        events
    }

    /// Handle a keyboard command. Undo/redo are not handled here.
    pub fn key<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        command: KeyCommand,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        match command {
            KeyCommand::Cancel => {
                self.pinch = None;
                if let InteractionMode::Annotating(_) = self.mode {
                    self.set_mode(InteractionMode::Idle, &mut events);
                    events.push(InteractionEvent::ToolChanged(AnnotationTool::Select));
                } else {
                    self.cancel_gesture(ctx, &mut events);
                }
            }
            KeyCommand::Delete => {
                if self.mode != InteractionMode::Idle {
                    return events;
                }
                let selection = ctx.store.selection().clone();
                let deleted = if let Some(edge) = &selection.edge {
                    ctx.store.delete_edge(edge).is_some()
                } else if let Some(node) = &selection.node {
                    ctx.store.delete_node(node).is_some()
                } else {
                    false
                };
                if deleted {
                    events.push(InteractionEvent::SelectionChanged(ctx.store.selection().clone()));
                }
            }
            KeyCommand::Undo | KeyCommand::Redo => {}
        }
        events
    }

    /// Abandon an in-progress pan, drag or connection.
    fn cancel_gesture<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        events: &mut Vec<InteractionEvent>,
    ) {
        match &self.mode {
            InteractionMode::Idle | InteractionMode::Annotating(_) => return,
            InteractionMode::Panning {
                start_transform, ..
            } => {
                let before = ctx.viewport.transform();
                if let Err(e) = ctx.viewport.set_transform(*start_transform) {
                    log::debug!("Could not restore pan start: {}", e);
                }
                push_viewport_change(ctx.viewport, before, events);
            }
            InteractionMode::DraggingNode { node, origin, .. } => {
                ctx.store.update_node_position(node, *origin);
            }
            InteractionMode::Connecting { source, .. } => {
                events.push(InteractionEvent::ConnectionDiscarded {
                    source: source.clone(),
                });
            }
        }
        self.set_mode(InteractionMode::Idle, events);
    }

    /// Switch annotation tool. Any in-progress gesture is cancelled first.
    pub fn select_tool<S: GraphStore + ?Sized>(
        &mut self,
        ctx: &mut Context<'_, S>,
        tool: AnnotationTool,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        if tool == self.tool() {
            return events;
        }
        self.pinch = None;
        self.cancel_gesture(ctx, &mut events);
        let mode = if tool.is_neutral() {
            InteractionMode::Idle
        } else {
            InteractionMode::Annotating(tool)
        };
        self.set_mode(mode, &mut events);
        events.push(InteractionEvent::ToolChanged(tool));
        events
    }

    /// The annotation engine finished a shape: revert to the select tool.
    pub fn finish_annotation(&mut self) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        if let InteractionMode::Annotating(_) = self.mode {
            self.set_mode(InteractionMode::Idle, &mut events);
            events.push(InteractionEvent::ToolChanged(AnnotationTool::Select));
        }
        events
    }
}

fn push_viewport_change(viewport: &Viewport, before: Transform, events: &mut Vec<InteractionEvent>) {
    let after = viewport.transform();
    if after != before {
        events.push(InteractionEvent::ViewportChanged(after));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DiagramGraph, Edge, Node, NodeTemplate};
    use crate::input::Modifiers;
    use kurbo::Size;

    /// Store double that counts mutating calls and otherwise delegates.
    #[derive(Default)]
    struct MockStore {
        inner: DiagramGraph,
        position_updates: usize,
        add_edge_calls: usize,
    }

    impl GraphStore for MockStore {
        fn nodes(&self) -> &[Node] {
            self.inner.nodes()
        }
        fn edges(&self) -> &[Edge] {
            self.inner.edges()
        }
        fn node(&self, id: &NodeId) -> Option<&Node> {
            self.inner.node(id)
        }
        fn update_node_position(&mut self, id: &NodeId, position: Point) -> bool {
            self.position_updates += 1;
            self.inner.update_node_position(id, position)
        }
        fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<EdgeId> {
            self.add_edge_calls += 1;
            self.inner.add_edge(source, target)
        }
        fn delete_node(&mut self, id: &NodeId) -> Option<Node> {
            self.inner.delete_node(id)
        }
        fn delete_edge(&mut self, id: &EdgeId) -> Option<Edge> {
            self.inner.delete_edge(id)
        }
        fn selection(&self) -> &Selection {
            self.inner.selection()
        }
        fn set_selected_node(&mut self, id: Option<NodeId>) {
            self.inner.set_selected_node(id)
        }
        fn set_selected_edge(&mut self, id: Option<EdgeId>) {
            self.inner.set_selected_edge(id)
        }
        fn set_details_panel(&mut self, open: bool) {
            self.inner.set_details_panel(open)
        }
        fn clear_selection(&mut self) {
            self.inner.clear_selection()
        }
    }

    struct Harness {
        machine: InteractionMachine,
        viewport: Viewport,
        coords: CoordinateConverter,
        store: MockStore,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                machine: InteractionMachine::default(),
                viewport: Viewport::default(),
                coords: CoordinateConverter::new(Point::ZERO, Size::new(800.0, 600.0), 1.0),
                store: MockStore::default(),
            }
        }

        fn add_node(&mut self, x: f64, y: f64) -> NodeId {
            self.store
                .inner
                .add_node(&NodeTemplate::default(), Point::new(x, y))
        }

        fn pointer(&mut self, event: PointerEvent) -> Vec<InteractionEvent> {
            let mut ctx = Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            };
            self.machine.pointer(&mut ctx, &event)
        }

        fn down(&mut self, x: f64, y: f64, path: HitPath) -> Vec<InteractionEvent> {
            self.pointer(PointerEvent::Down {
                position: Point::new(x, y),
                button: MouseButton::Left,
                path,
            })
        }

        fn move_to(&mut self, x: f64, y: f64) -> Vec<InteractionEvent> {
            self.pointer(PointerEvent::Move {
                position: Point::new(x, y),
            })
        }

        fn up(&mut self, x: f64, y: f64, path: HitPath) -> Vec<InteractionEvent> {
            self.pointer(PointerEvent::Up {
                position: Point::new(x, y),
                path,
            })
        }

        fn wheel(&mut self, delta_y: f64, modifiers: Modifiers) -> Vec<InteractionEvent> {
            let mut ctx = Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            };
            let event = WheelEvent {
                position: Point::new(400.0, 300.0),
                delta: Vec2::new(0.0, delta_y),
                modifiers,
            };
            self.machine.wheel(&mut ctx, &event)
        }

        fn touch(&mut self, event: TouchEvent) -> Vec<InteractionEvent> {
            let mut ctx = Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            };
            self.machine.touch(&mut ctx, &event)
        }

        fn key(&mut self, command: KeyCommand) -> Vec<InteractionEvent> {
            let mut ctx = Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            };
            self.machine.key(&mut ctx, command)
        }

        fn select_tool(&mut self, tool: AnnotationTool) -> Vec<InteractionEvent> {
            let mut ctx = Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            };
            self.machine.select_tool(&mut ctx, tool)
        }

        fn click(&mut self, path: HitPath) -> Vec<InteractionEvent> {
            self.machine.click(&mut self.store, &path)
        }

        fn node_center(&self, id: &NodeId) -> Point {
            self.store.node(id).unwrap().center()
        }
    }

    fn node_path(id: &NodeId) -> HitPath {
        HitPath::on_canvas(Target::Node(id.clone()))
    }

    fn output_path(id: &NodeId) -> HitPath {
        HitPath::new(vec![
            Target::OutputPort(id.clone()),
            Target::Node(id.clone()),
            Target::Canvas,
        ])
    }

    fn input_path(id: &NodeId) -> HitPath {
        HitPath::new(vec![
            Target::InputPort(id.clone()),
            Target::Node(id.clone()),
            Target::Canvas,
        ])
    }

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_pan_on_empty_canvas() {
        let mut h = Harness::new();
        h.viewport.zoom_to(2.0);

        let events = h.down(100.0, 100.0, HitPath::canvas());
        assert_eq!(events, vec![InteractionEvent::ModeChanged(ModeKind::Panning)]);

        h.move_to(120.0, 110.0);
        let events = h.move_to(150.0, 130.0);
        assert_eq!(h.viewport.transform(), Transform::new(2.0, 50.0, 30.0));
        assert_eq!(
            events,
            vec![InteractionEvent::ViewportChanged(Transform::new(2.0, 50.0, 30.0))]
        );

        let events = h.up(150.0, 130.0, HitPath::canvas());
        assert_eq!(events, vec![InteractionEvent::ModeChanged(ModeKind::Idle)]);
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_pan_disabled_at_low_zoom() {
        let mut h = Harness::new();
        h.viewport.zoom_to(1.0);
        h.down(100.0, 100.0, HitPath::canvas());
        let events = h.move_to(300.0, 300.0);
        assert!(events.is_empty());
        assert_eq!(h.viewport.transform().translation(), Vec2::ZERO);
    }

    #[test]
    fn test_interactive_ancestor_blocks_pan() {
        let mut h = Harness::new();
        for path in [
            HitPath::new(vec![Target::Canvas, Target::Dock]),
            HitPath::on_canvas(Target::Header),
            HitPath::on_canvas(Target::NoPan),
        ] {
            assert!(h.down(10.0, 10.0, path).is_empty());
            assert_eq!(h.machine.mode(), &InteractionMode::Idle);
        }
    }

    #[test]
    fn test_pointer_leave_ends_pan() {
        let mut h = Harness::new();
        h.down(0.0, 0.0, HitPath::canvas());
        h.pointer(PointerEvent::Leave);
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_drag_moves_node_by_scaled_delta() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.viewport.zoom_to(2.0);

        // Node centre projects to (200, 200); grab it 10px right of centre.
        h.down(210.0, 200.0, node_path(&id));
        match h.machine.mode() {
            InteractionMode::DraggingNode { grab_offset, .. } => {
                assert_eq!(*grab_offset, Vec2::new(5.0, 0.0));
            }
            other => panic!("unexpected mode {:?}", other),
        }

        h.move_to(230.0, 220.0);
        assert_eq!(h.node_center(&id), Point::new(110.0, 110.0));

        let events = h.up(230.0, 220.0, node_path(&id));
        assert!(events.contains(&InteractionEvent::NodeMoved {
            node: id.clone(),
            from: Point::new(100.0, 100.0),
            to: Point::new(110.0, 110.0),
        }));
        assert!(h.machine.drag_just_completed());
    }

    #[test]
    fn test_stationary_drag_emits_no_move() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(150.0, 150.0, node_path(&id));
        h.move_to(151.0, 150.0);
        let events = h.up(151.0, 150.0, node_path(&id));
        assert_eq!(events, vec![InteractionEvent::ModeChanged(ModeKind::Idle)]);
        assert!(h.machine.drag_just_completed());
    }

    #[test]
    fn test_drag_completion_preserves_selection() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.click(node_path(&id));
        assert_eq!(h.store.selection().node, Some(id.clone()));

        h.down(150.0, 150.0, node_path(&id));
        h.move_to(200.0, 180.0);
        h.up(200.0, 180.0, node_path(&id));

        // Pointer released over the background: the click must not clear.
        assert!(h.click(HitPath::canvas()).is_empty());
        assert_eq!(h.store.selection().node, Some(id.clone()));

        // The suppression only lasts for one click.
        h.down(10.0, 10.0, HitPath::canvas());
        h.up(10.0, 10.0, HitPath::canvas());
        let events = h.click(HitPath::canvas());
        assert_eq!(events.len(), 1);
        assert!(h.store.selection().is_empty());
    }

    #[test]
    fn test_pointer_down_resets_drag_flag() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.click(node_path(&id));
        h.down(150.0, 150.0, node_path(&id));
        h.up(150.0, 150.0, node_path(&id));
        assert!(h.machine.drag_just_completed());

        h.down(10.0, 10.0, HitPath::canvas());
        assert!(!h.machine.drag_just_completed());
    }

    #[test]
    fn test_connect_creates_single_edge() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        let b = h.add_node(300.0, 100.0);
        let a_port = Point::new(127.5, 100.0);
        let b_port = Point::new(272.5, 100.0);

        for round in 0..2 {
            // Pointer lands a few pixels off the port centre.
            h.down(a_port.x * 1.5 + 2.0, a_port.y * 1.5 - 1.0, output_path(&a));
            assert_eq!(h.machine.rubber_band(), Some(Line::new(a_port, a_port)));

            h.move_to(b_port.x * 1.5 + 2.0, b_port.y * 1.5 - 1.0);
            let band = h.machine.rubber_band().unwrap();
            assert!((band.p1.x - b_port.x).abs() < 1e-9);
            assert!((band.p1.y - b_port.y).abs() < 1e-9);

            let events = h.up(b_port.x * 1.5, b_port.y * 1.5, input_path(&b));
            if round == 0 {
                assert!(matches!(events.last(), Some(InteractionEvent::EdgeCreated(_))));
            } else {
                assert_eq!(
                    events.last(),
                    Some(&InteractionEvent::ConnectionDiscarded { source: a.clone() })
                );
            }
            assert_eq!(h.machine.rubber_band(), None);
        }

        assert_eq!(h.store.edges().len(), 1);
        assert_eq!(h.store.edges()[0].source, a);
        assert_eq!(h.store.edges()[0].target, b);
    }

    #[test]
    fn test_connect_to_self_is_discarded() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        h.down(191.0, 150.0, output_path(&a));
        let events = h.up(110.0, 150.0, input_path(&a));
        assert!(events.contains(&InteractionEvent::ConnectionDiscarded { source: a }));
        assert_eq!(h.store.add_edge_calls, 0);
        assert!(h.store.edges().is_empty());
    }

    #[test]
    fn test_connect_released_elsewhere() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        h.add_node(300.0, 100.0);
        h.down(191.0, 150.0, output_path(&a));
        h.up(600.0, 500.0, HitPath::canvas());
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
        assert!(h.store.edges().is_empty());
    }

    #[test]
    fn test_ctrl_wheel_zooms() {
        let mut h = Harness::new();
        let events = h.wheel(-100.0, ctrl());
        assert!((h.viewport.scale() - 1.65).abs() < 1e-9);
        assert_eq!(events.len(), 1);

        h.wheel(-1e6, ctrl());
        assert!((h.viewport.scale() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ctrl_wheel_fast_zoom_out_hits_min() {
        let mut h = Harness::new();
        h.viewport.zoom_to(3.0);
        // Factor goes negative: 1 - 1500 * 0.001
        let events = h.wheel(1500.0, ctrl());
        assert!((h.viewport.scale() - 1.0).abs() < f64::EPSILON);
        assert_eq!(events.len(), 1);

        h.wheel(1000.0, ctrl());
        assert!((h.viewport.scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_plain_wheel_ignored() {
        let mut h = Harness::new();
        assert!(h.wheel(-100.0, Modifiers::NONE).is_empty());
        assert!((h.viewport.scale() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wheel_ignored_while_annotating() {
        let mut h = Harness::new();
        h.select_tool(AnnotationTool::Rectangle);
        assert!(h.wheel(-100.0, ctrl()).is_empty());
        assert!((h.viewport.scale() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pinch_zoom() {
        let mut h = Harness::new();
        h.touch(TouchEvent::Start {
            touches: vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)],
            path: HitPath::canvas(),
        });
        assert!(h.machine.is_pinching());

        h.touch(TouchEvent::Move {
            touches: vec![Point::new(50.0, 100.0), Point::new(250.0, 100.0)],
        });
        assert!((h.viewport.scale() - 3.0).abs() < 1e-9);

        // One finger lifted: the remaining pair no longer zooms.
        h.touch(TouchEvent::End {
            remaining: vec![Point::new(50.0, 100.0)],
            path: HitPath::canvas(),
        });
        h.touch(TouchEvent::Move {
            touches: vec![Point::new(0.0, 100.0), Point::new(400.0, 100.0)],
        });
        assert!((h.viewport.scale() - 3.0).abs() < 1e-9);

        h.touch(TouchEvent::End {
            remaining: vec![],
            path: HitPath::canvas(),
        });
        assert!(!h.machine.is_pinching());
    }

    #[test]
    fn test_pinch_on_interactive_target_ignored() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.touch(TouchEvent::Start {
            touches: vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)],
            path: node_path(&id),
        });
        assert!(!h.machine.is_pinching());
    }

    #[test]
    fn test_single_touch_pans() {
        let mut h = Harness::new();
        h.viewport.zoom_to(3.0);
        h.touch(TouchEvent::Start {
            touches: vec![Point::new(100.0, 100.0)],
            path: HitPath::canvas(),
        });
        h.touch(TouchEvent::Move {
            touches: vec![Point::new(140.0, 80.0)],
        });
        assert_eq!(h.viewport.transform(), Transform::new(3.0, 40.0, -20.0));

        h.touch(TouchEvent::End {
            remaining: vec![],
            path: HitPath::canvas(),
        });
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_escape_restores_pan_start() {
        let mut h = Harness::new();
        h.viewport.zoom_to(3.0);
        let start = h.viewport.transform();
        h.down(100.0, 100.0, HitPath::canvas());
        h.move_to(300.0, 200.0);
        assert_ne!(h.viewport.transform(), start);

        h.key(KeyCommand::Cancel);
        assert_eq!(h.viewport.transform(), start);
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_escape_restores_drag_origin() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(150.0, 150.0, node_path(&id));
        h.move_to(300.0, 300.0);
        assert_ne!(h.node_center(&id), Point::new(100.0, 100.0));

        h.key(KeyCommand::Cancel);
        assert_eq!(h.node_center(&id), Point::new(100.0, 100.0));
        assert!(!h.machine.drag_just_completed());
    }

    #[test]
    fn test_escape_drops_pending_connection() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        h.down(191.0, 150.0, output_path(&a));
        let events = h.key(KeyCommand::Cancel);
        assert!(events.contains(&InteractionEvent::ConnectionDiscarded { source: a }));
        assert_eq!(h.machine.rubber_band(), None);
    }

    #[test]
    fn test_nested_gesture_ignored() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(10.0, 10.0, HitPath::canvas());
        assert!(h.down(150.0, 150.0, node_path(&id)).is_empty());
        assert_eq!(h.machine.mode().kind(), ModeKind::Panning);
    }

    #[test]
    fn test_annotation_tool_forwards_pointer() {
        let mut h = Harness::new();
        h.viewport.zoom_to(2.0);
        let events = h.select_tool(AnnotationTool::Rectangle);
        assert!(events.contains(&InteractionEvent::ToolChanged(AnnotationTool::Rectangle)));
        assert_eq!(h.machine.mode(), &InteractionMode::Annotating(AnnotationTool::Rectangle));

        let events = h.down(100.0, 60.0, HitPath::canvas());
        match events.as_slice() {
            [InteractionEvent::ForwardToAnnotation { canvas, .. }] => {
                assert_eq!(*canvas, Point::new(50.0, 30.0));
            }
            other => panic!("unexpected events {:?}", other),
        }
        assert_eq!(h.viewport.transform().translation(), Vec2::ZERO);

        let events = h.machine.finish_annotation();
        assert!(events.contains(&InteractionEvent::ToolChanged(AnnotationTool::Select)));
        assert_eq!(h.machine.tool(), AnnotationTool::Select);
    }

    #[test]
    fn test_tool_switch_cancels_drag() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(150.0, 150.0, node_path(&id));
        h.move_to(250.0, 250.0);
        h.select_tool(AnnotationTool::Freedraw);
        assert_eq!(h.node_center(&id), Point::new(100.0, 100.0));
        assert_eq!(h.machine.tool(), AnnotationTool::Freedraw);
    }

    #[test]
    fn test_escape_leaves_annotation_mode() {
        let mut h = Harness::new();
        h.select_tool(AnnotationTool::Text);
        let events = h.key(KeyCommand::Cancel);
        assert!(events.contains(&InteractionEvent::ToolChanged(AnnotationTool::Select)));
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_click_selection() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        let b = h.add_node(300.0, 100.0);
        let edge = h.store.inner.add_edge(&a, &b).unwrap();

        h.click(node_path(&a));
        assert_eq!(h.store.selection().node, Some(a.clone()));

        let events = h.click(HitPath::on_canvas(Target::Edge(edge.clone())));
        assert_eq!(h.store.selection().edge, Some(edge));
        assert!(h.store.selection().node.is_none());
        assert_eq!(events.len(), 1);

        // Clicks on dock controls leave the selection alone.
        assert!(h.click(HitPath::on_canvas(Target::Dock)).is_empty());

        h.click(HitPath::canvas());
        assert!(h.store.selection().is_empty());
        assert!(!h.store.selection().details_panel_open);
    }

    #[test]
    fn test_delete_key() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        let b = h.add_node(300.0, 100.0);
        let edge = h.store.inner.add_edge(&a, &b).unwrap();

        h.click(HitPath::on_canvas(Target::Edge(edge)));
        h.key(KeyCommand::Delete);
        assert!(h.store.edges().is_empty());
        assert_eq!(h.store.nodes().len(), 2);

        h.store.inner.add_edge(&a, &b);
        h.click(node_path(&a));
        h.key(KeyCommand::Delete);
        assert_eq!(h.store.nodes().len(), 1);
        assert!(h.store.edges().is_empty());

        // Nothing selected
        assert!(h.key(KeyCommand::Delete).is_empty());
    }

    #[test]
    fn test_touch_connect_creates_edge() {
        let mut h = Harness::new();
        let a = h.add_node(100.0, 100.0);
        let b = h.add_node(300.0, 100.0);

        h.touch(TouchEvent::Start {
            touches: vec![Point::new(191.0, 150.0)],
            path: output_path(&a),
        });
        assert_eq!(h.machine.mode().kind(), ModeKind::Connecting);
        h.touch(TouchEvent::Move {
            touches: vec![Point::new(409.0, 150.0)],
        });
        let events = h.touch(TouchEvent::End {
            remaining: vec![],
            path: input_path(&b),
        });

        assert!(matches!(events.last(), Some(InteractionEvent::EdgeCreated(_))));
        assert_eq!(h.store.edges().len(), 1);
        assert_eq!(h.store.edges()[0].source, a);
        assert_eq!(h.store.edges()[0].target, b);
        assert_eq!(h.machine.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_sub_threshold_drag_restores_origin() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(150.0, 150.0, node_path(&id));
        h.move_to(151.5, 150.0);
        assert_eq!(h.node_center(&id), Point::new(101.0, 100.0));

        let events = h.up(151.5, 150.0, node_path(&id));
        assert!(!events.iter().any(|e| matches!(e, InteractionEvent::NodeMoved { .. })));
        assert_eq!(h.node_center(&id), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_drag_updates_store_each_move() {
        let mut h = Harness::new();
        let id = h.add_node(100.0, 100.0);
        h.down(150.0, 150.0, node_path(&id));
        for i in 0..5 {
            h.move_to(150.0 + i as f64, 150.0);
        }
        assert_eq!(h.store.position_updates, 5);
    }
}
