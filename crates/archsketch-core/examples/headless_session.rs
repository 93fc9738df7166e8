//! Drives an editor without a UI: pans, zooms, drags a node, connects two
//! nodes and persists the workspace to a scratch directory.
//!
//! Run with `RUST_LOG=debug` to see mode transitions.

use archsketch_core::graph::{input_port, output_port};
use archsketch_core::storage::{AutoSaveManager, FileStorage, StorageResult};
use archsketch_core::{
    DiagramGraph, Editor, EditorConfig, GraphStore, HitPath, KeyCommand, Modifiers, MouseButton,
    NodeTemplate, PointerEvent, Target, WheelEvent,
};
use kurbo::{Point, Vec2};
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Instant;

fn block_on<F: Future>(f: F) -> F::Output {
    let mut cx = Context::from_waker(Waker::noop());
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

fn main() -> StorageResult<()> {
    env_logger::init();

    let mut editor = Editor::with_store(DiagramGraph::sample(), EditorConfig::default());
    let now = Instant::now();

    // Ctrl+wheel zooms in
    editor.wheel(&WheelEvent {
        position: Point::new(400.0, 300.0),
        delta: Vec2::new(0.0, -200.0),
        modifiers: Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        },
    });
    log::info!("Zoom: {:.0}%", editor.viewport().zoom_percent());

    // Pan the background
    editor.pointer(
        &PointerEvent::Down {
            position: Point::new(400.0, 300.0),
            button: MouseButton::Left,
            path: HitPath::canvas(),
        },
        now,
    );
    editor.pointer(&PointerEvent::Move { position: Point::new(350.0, 280.0) }, now);
    editor.pointer(&PointerEvent::Up { position: Point::new(350.0, 280.0), path: HitPath::canvas() }, now);
    log::info!("Transform after pan: {:?}", editor.viewport().transform());

    // Drop a cache next to the database and wire it up
    let cache = editor.drop_node(
        &NodeTemplate {
            label: Some("Cache".into()),
            icon: Some("Zap".into()),
            ..NodeTemplate::default()
        },
        Point::new(600.0, 450.0),
    );
    let service = editor.store().nodes()[2].id.clone();
    let transform = editor.viewport().transform();
    let geometry = editor.config().nodes;
    let (Some(source), Some(target)) = (editor.store().node(&service), editor.store().node(&cache))
    else {
        return Ok(());
    };
    let from = editor
        .coords()
        .to_viewport(&transform, output_port(source, &geometry));
    let to = editor
        .coords()
        .to_viewport(&transform, input_port(target, &geometry));

    editor.pointer(
        &PointerEvent::Down {
            position: from,
            button: MouseButton::Left,
            path: HitPath::new(vec![
                Target::OutputPort(service.clone()),
                Target::Node(service.clone()),
                Target::Canvas,
            ]),
        },
        now,
    );
    editor.pointer(&PointerEvent::Move { position: to }, now);
    let events = editor.pointer(
        &PointerEvent::Up {
            position: to,
            path: HitPath::new(vec![
                Target::InputPort(cache.clone()),
                Target::Node(cache.clone()),
                Target::Canvas,
            ]),
        },
        now,
    );
    for event in &events {
        log::info!("{:?}", event);
    }

    // Select the cache and delete it again
    editor.click(&HitPath::on_canvas(Target::Node(cache)));
    editor.key(KeyCommand::Delete, now);
    log::info!(
        "{} nodes, {} edges",
        editor.store().nodes().len(),
        editor.store().edges().len()
    );

    let dir = std::env::temp_dir().join("archsketch-headless");
    let mut manager = AutoSaveManager::new(Arc::new(FileStorage::new(dir.clone())?));
    block_on(editor.autosave(&mut manager, now))?;
    log::info!("Workspace written to {}", dir.display());

    let mut reopened = Editor::default();
    if block_on(reopened.load(&mut manager, now))? {
        log::info!("Reloaded {} nodes", reopened.store().nodes().len());
    }
    Ok(())
}
