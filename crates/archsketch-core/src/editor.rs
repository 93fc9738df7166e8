//! Editor state: the viewport, diagram graph, interaction machine and
//! annotation layer, plus the routing of input events between them.

use crate::annotation::{AnnotationEngine, AnnotationError, AnnotationLayer, EngineSignal};
use crate::config::EditorConfig;
use crate::coords::CoordinateConverter;
use crate::graph::{DiagramGraph, GraphStore, NodeId, NodeTemplate};
use crate::input::{HitPath, KeyCommand, PointerEvent, TouchEvent, WheelEvent};
use crate::interaction::{Context, InteractionEvent, InteractionMachine, InteractionMode};
use crate::simulation::{LoadLevel, LoadReport};
use crate::storage::{AnnotationRecord, AutoSaveManager, Storage, StorageResult, WorkspaceRecord};
use crate::tools::AnnotationTool;
use crate::viewport::Viewport;
use kurbo::{Affine, Point, Size};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Simulation controls persisted alongside the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Simulated requests per second.
    pub simulation_rate: u32,
    pub run_flag: bool,
    pub fullscreen: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            simulation_rate: 1,
            run_flag: false,
            fullscreen: false,
        }
    }
}

/// Editor state for one workspace.
pub struct Editor<S: GraphStore = DiagramGraph> {
    store: S,
    viewport: Viewport,
    coords: CoordinateConverter,
    machine: InteractionMachine,
    annotations: AnnotationLayer,
    config: EditorConfig,
    session: SessionSettings,
    /// Persisted state changed since the last `take_dirty`.
    dirty: bool,
}

impl Default for Editor<DiagramGraph> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor<DiagramGraph> {
    /// Create an editor with an empty diagram.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_store(DiagramGraph::new(), config)
    }

    /// Add a node from a catalog entry dropped at a client-space position.
    pub fn drop_node(&mut self, template: &NodeTemplate, client: Point) -> NodeId {
        let at = self.coords.to_canvas(&self.viewport.transform(), client);
        let id = self.store.add_node(template, at);
        log::debug!("Dropped node {} at ({:.1}, {:.1})", id, at.x, at.y);
        self.dirty = true;
        id
    }

    /// Replace the workspace with a persisted record.
    ///
    /// Selection, in-progress gestures and the active tool are reset.
    pub fn restore_workspace(&mut self, record: WorkspaceRecord) {
        self.store.replace(record.nodes, record.edges);
        self.machine.reset();
        self.annotations.set_tool(AnnotationTool::Select);
        if let Err(e) = self.viewport.set_transform(record.canvas_transform) {
            log::warn!("Ignoring persisted transform: {}", e);
            self.viewport.reset();
        }
        self.session = SessionSettings {
            simulation_rate: record.simulation_rate,
            run_flag: record.run_flag,
            fullscreen: record.fullscreen,
        };
        self.dirty = false;
    }

    /// Load the workspace and annotation history saved by `manager`.
    ///
    /// Returns true if a workspace record was found.
    pub async fn load<St: Storage>(
        &mut self,
        manager: &mut AutoSaveManager<St>,
        now: Instant,
    ) -> StorageResult<bool> {
        if let Some(history) = manager.load_annotations().await? {
            self.annotations.import(history, now);
        }
        match manager.load_workspace().await? {
            Some(record) => {
                self.restore_workspace(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S: GraphStore> Editor<S> {
    /// Create an editor over an existing graph store.
    ///
    /// Annotations start disabled until [`Editor::set_annotation_engine`]
    /// installs an engine.
    pub fn with_store(store: S, config: EditorConfig) -> Self {
        let viewport = Viewport::new(&config.viewport);
        let coords = CoordinateConverter::new(
            Point::ZERO,
            config.viewport.canvas_size,
            config.viewport.layer_scale,
        );
        Self {
            store,
            viewport,
            coords,
            machine: InteractionMachine::new(&config),
            annotations: AnnotationLayer::new(
                Box::new(crate::annotation::DisabledAnnotationEngine),
                &config.history,
            ),
            config,
            session: SessionSettings::default(),
            dirty: false,
        }
    }

    /// Install the annotation engine, or degrade if it failed to initialise.
    pub fn set_annotation_engine(
        &mut self,
        engine: Result<Box<dyn AnnotationEngine>, AnnotationError>,
    ) {
        self.annotations = AnnotationLayer::from_init(engine, &self.config.history);
        self.annotations.set_tool(self.machine.tool());
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn coords(&self) -> &CoordinateConverter {
        &self.coords
    }

    pub fn machine(&self) -> &InteractionMachine {
        &self.machine
    }

    pub fn mode(&self) -> &InteractionMode {
        self.machine.mode()
    }

    pub fn annotations(&self) -> &AnnotationLayer {
        &self.annotations
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn session(&self) -> SessionSettings {
        self.session
    }

    /// Follow the canvas container moving or resizing.
    pub fn set_bounds(&mut self, origin: Point, size: Size) {
        self.coords.set_bounds(origin, size);
        self.viewport.set_canvas_size(size);
    }

    fn parts(&mut self) -> (&mut InteractionMachine, Context<'_, S>) {
        (
            &mut self.machine,
            Context {
                viewport: &mut self.viewport,
                coords: &self.coords,
                store: &mut self.store,
            },
        )
    }

    pub fn pointer(&mut self, event: &PointerEvent, now: Instant) -> Vec<InteractionEvent> {
        let (machine, mut ctx) = self.parts();
        let events = machine.pointer(&mut ctx, event);
        self.dispatch(events, now)
    }

    pub fn wheel(&mut self, event: &WheelEvent) -> Vec<InteractionEvent> {
        let (machine, mut ctx) = self.parts();
        let events = machine.wheel(&mut ctx, event);
        self.dispatch_without_annotations(events)
    }

    pub fn touch(&mut self, event: &TouchEvent, now: Instant) -> Vec<InteractionEvent> {
        let (machine, mut ctx) = self.parts();
        let events = machine.touch(&mut ctx, event);
        self.dispatch(events, now)
    }

    pub fn click(&mut self, path: &HitPath) -> Vec<InteractionEvent> {
        self.machine.click(&mut self.store, path)
    }

    /// Handle a keyboard command.
    ///
    /// Undo and redo act on the annotation history. Delete removes selected
    /// annotation objects first and falls back to the selected edge or node.
    pub fn key(&mut self, command: KeyCommand, now: Instant) -> Vec<InteractionEvent> {
        match command {
            KeyCommand::Undo => {
                self.dirty |= self.annotations.undo(now);
                Vec::new()
            }
            KeyCommand::Redo => {
                self.dirty |= self.annotations.redo(now);
                Vec::new()
            }
            KeyCommand::Cancel => {
                self.annotations.discard_active();
                let (machine, mut ctx) = self.parts();
                let events = machine.key(&mut ctx, command);
                self.dispatch(events, now)
            }
            KeyCommand::Delete => {
                if self.annotations.delete_selection(now) {
                    self.dirty = true;
                    return Vec::new();
                }
                let before = (self.store.nodes().len(), self.store.edges().len());
                let (machine, mut ctx) = self.parts();
                let events = machine.key(&mut ctx, command);
                if (self.store.nodes().len(), self.store.edges().len()) != before {
                    self.dirty = true;
                }
                self.dispatch(events, now)
            }
        }
    }

    /// Switch the annotation tool.
    pub fn select_tool(&mut self, tool: AnnotationTool, now: Instant) -> Vec<InteractionEvent> {
        let (machine, mut ctx) = self.parts();
        let events = machine.select_tool(&mut ctx, tool);
        self.dispatch(events, now)
    }

    /// Fire due annotation saves and advance a pending annotation restore.
    pub fn tick(&mut self, now: Instant) {
        if self.annotations.tick(now) {
            self.dirty = true;
        }
    }

    /// Apply side effects of machine events and return them to the host.
    fn dispatch(&mut self, events: Vec<InteractionEvent>, now: Instant) -> Vec<InteractionEvent> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            let mut follow_up = Vec::new();
            match &event {
                InteractionEvent::ForwardToAnnotation { event, canvas } => {
                    match self.annotations.pointer(event, *canvas, now) {
                        EngineSignal::None => {}
                        EngineSignal::Modified => self.dirty = true,
                        EngineSignal::Finished => {
                            self.dirty = true;
                            follow_up = self.machine.finish_annotation();
                        }
                    }
                }
                InteractionEvent::ToolChanged(tool) => self.annotations.set_tool(*tool),
                InteractionEvent::NodeMoved { .. }
                | InteractionEvent::EdgeCreated(_)
                | InteractionEvent::ViewportChanged(_) => self.dirty = true,
                _ => {}
            }
            out.push(event);
            for event in follow_up {
                if let InteractionEvent::ToolChanged(tool) = &event {
                    self.annotations.set_tool(*tool);
                }
                out.push(event);
            }
        }
        out
    }

    fn dispatch_without_annotations(&mut self, events: Vec<InteractionEvent>) -> Vec<InteractionEvent> {
        if events
            .iter()
            .any(|e| matches!(e, InteractionEvent::ViewportChanged(_)))
        {
            self.dirty = true;
        }
        events
    }

    fn change_viewport(&mut self, f: impl FnOnce(&mut Viewport)) -> Option<InteractionEvent> {
        let before = self.viewport.transform();
        f(&mut self.viewport);
        let after = self.viewport.transform();
        if after == before {
            return None;
        }
        self.dirty = true;
        Some(InteractionEvent::ViewportChanged(after))
    }

    pub fn zoom_in(&mut self) -> Option<InteractionEvent> {
        self.change_viewport(Viewport::zoom_in)
    }

    pub fn zoom_out(&mut self) -> Option<InteractionEvent> {
        self.change_viewport(Viewport::zoom_out)
    }

    /// Back to the baseline scale with no pan.
    pub fn reset_view(&mut self) -> Option<InteractionEvent> {
        self.change_viewport(Viewport::reset)
    }

    /// Fit the view to all node footprints. An empty diagram resets the view.
    pub fn fit_to_content(&mut self) -> Option<InteractionEvent> {
        let size = self.config.nodes.size;
        let bounds = self
            .store
            .nodes()
            .iter()
            .map(|n| n.footprint(size))
            .reduce(|a, b| a.union(b))
            .map(|b| Affine::scale(self.coords.layer_scale).transform_rect_bbox(b));
        let container = self.coords.size;
        let padding = self.config.viewport.zoom_to_fit_padding;
        match bounds {
            Some(bounds) => self.change_viewport(|v| v.zoom_to_fit(bounds, container, padding)),
            None => self.change_viewport(Viewport::reset),
        }
    }

    /// Clear the node/edge selection and collapse the details panel.
    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn set_simulation_rate(&mut self, rate: u32) {
        let before = LoadLevel::from_rate(self.session.simulation_rate);
        self.session.simulation_rate = rate;
        let after = LoadLevel::from_rate(rate);
        if before != after {
            log::info!("Simulated load {:?} -> {:?} at {} rps", before, after, rate);
        }
        self.dirty = true;
    }

    /// Load model for the current simulation rate.
    pub fn load_report(&self) -> LoadReport {
        LoadReport::from_session(&self.session)
    }

    pub fn set_run_flag(&mut self, running: bool) {
        self.session.run_flag = running;
        self.dirty = true;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.session.fullscreen = fullscreen;
        self.dirty = true;
    }

    /// Whether persisted state changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Persisted view of the workspace. Dangling edges are left out.
    pub fn workspace_record(&self) -> WorkspaceRecord {
        let nodes = self.store.nodes();
        let has = |id: &NodeId| nodes.iter().any(|n| &n.id == id);
        WorkspaceRecord {
            nodes: nodes.to_vec(),
            edges: self
                .store
                .edges()
                .iter()
                .filter(|e| has(&e.source) && has(&e.target))
                .cloned()
                .collect(),
            canvas_transform: self.viewport.transform(),
            simulation_rate: self.session.simulation_rate,
            run_flag: self.session.run_flag,
            fullscreen: self.session.fullscreen,
        }
    }

    pub fn annotation_record(&self) -> AnnotationRecord {
        self.annotations.export()
    }

    /// Hand pending changes to `manager` and save if its interval elapsed.
    pub async fn autosave<St: Storage>(
        &mut self,
        manager: &mut AutoSaveManager<St>,
        now: Instant,
    ) -> StorageResult<bool> {
        if self.take_dirty() {
            manager.mark_dirty();
        }
        if !manager.is_dirty() {
            return Ok(false);
        }
        let workspace = self.workspace_record();
        let annotations = self.annotation_record();
        manager.maybe_save(&workspace, &annotations, now).await
    }
}
