//! Auto-save of the workspace and annotation history.
//!
//! The editor hands its dirty flag to the manager and calls
//! [`AutoSaveManager::maybe_save`] from `Editor::autosave`, which the host
//! invokes from its frame/tick loop.

use super::records::{ANNOTATIONS_KEY, AnnotationRecord, WORKSPACE_KEY, WorkspaceRecord};
use super::{Storage, StorageResult, load_json, save_json};
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 2;

/// Manages automatic workspace persistence.
pub struct AutoSaveManager<S: Storage> {
    /// Storage backend.
    storage: Arc<S>,
    /// Auto-save interval.
    interval: Duration,
    /// Last save timestamp.
    last_save: Option<Instant>,
    /// Whether the workspace has unsaved changes.
    dirty: bool,
}

impl<S: Storage> AutoSaveManager<S> {
    /// Create a new auto-save manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the workspace as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and the interval has elapsed. Returns true if a save
    /// was performed.
    pub async fn maybe_save(
        &mut self,
        workspace: &WorkspaceRecord,
        annotations: &AnnotationRecord,
        now: Instant,
    ) -> StorageResult<bool> {
        if !self.should_save(now) {
            return Ok(false);
        }
        self.save(workspace, annotations, now).await?;
        Ok(true)
    }

    /// Write both records immediately.
    pub async fn save(
        &mut self,
        workspace: &WorkspaceRecord,
        annotations: &AnnotationRecord,
        now: Instant,
    ) -> StorageResult<()> {
        if let Err(e) = save_json(self.storage.as_ref(), WORKSPACE_KEY, workspace).await {
            log::warn!("Failed to save workspace: {}", e);
            return Err(e);
        }
        if let Err(e) = save_json(self.storage.as_ref(), ANNOTATIONS_KEY, annotations).await {
            log::warn!("Failed to save annotation history: {}", e);
            return Err(e);
        }
        log::info!(
            "Saved workspace ({} nodes, {} edges, {} annotation snapshots)",
            workspace.nodes.len(),
            workspace.edges.len(),
            annotations.canvas_state_history.len()
        );
        self.last_save = Some(now);
        self.dirty = false;
        Ok(())
    }

    /// Load the persisted workspace, if any.
    pub async fn load_workspace(&mut self) -> StorageResult<Option<WorkspaceRecord>> {
        let record: Option<WorkspaceRecord> =
            load_json(self.storage.as_ref(), WORKSPACE_KEY).await?;
        if let Some(record) = &record {
            log::info!(
                "Loaded workspace ({} nodes, {} edges)",
                record.nodes.len(),
                record.edges.len()
            );
            self.dirty = false;
        }
        Ok(record)
    }

    /// Load the persisted annotation history, if any.
    pub async fn load_annotations(&self) -> StorageResult<Option<AnnotationRecord>> {
        load_json(self.storage.as_ref(), ANNOTATIONS_KEY).await
    }

    /// Remove both records.
    pub async fn clear(&mut self) -> StorageResult<()> {
        self.storage.delete(WORKSPACE_KEY).await?;
        self.storage.delete(ANNOTATIONS_KEY).await?;
        self.dirty = false;
        self.last_save = None;
        Ok(())
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::LocalStorage>> {
    Ok(Arc::new(crate::storage::LocalStorage::new()))
}

/// Convenience type alias for platform-specific storage.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = crate::storage::FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = crate::storage::LocalStorage;

/// Type alias for the auto-save manager with platform-specific storage.
pub type PlatformAutoSaveManager = AutoSaveManager<PlatformStorage>;

/// Convenience function to create an auto-save manager with default storage.
pub fn create_autosave_manager() -> StorageResult<PlatformAutoSaveManager> {
    let storage = create_default_storage()?;
    Ok(AutoSaveManager::new(storage))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::annotation::CanvasState;
    use crate::graph::{DiagramGraph, GraphStore};
    use crate::storage::{MemoryStorage, block_on};
    use crate::viewport::Transform;

    fn workspace() -> WorkspaceRecord {
        let graph = DiagramGraph::sample();
        WorkspaceRecord {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            canvas_transform: Transform::new(2.0, 40.0, 0.0),
            ..WorkspaceRecord::default()
        }
    }

    #[test]
    fn test_autosave_manager_creation() {
        let manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        assert!(!manager.is_dirty());
        assert!(!manager.should_save(Instant::now()));
    }

    #[test]
    fn test_autosave_respects_interval() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        let start = Instant::now();

        manager.mark_dirty();
        // Never saved, should save
        assert!(manager.should_save(start));
        block_on(manager.save(&workspace(), &AnnotationRecord::default(), start)).unwrap();
        assert!(!manager.is_dirty());

        manager.mark_dirty();
        assert!(!manager.should_save(start + Duration::from_millis(500)));
        assert!(manager.should_save(start + manager.interval()));
    }

    #[test]
    fn test_maybe_save_skips_clean_workspace() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        let saved = block_on(manager.maybe_save(
            &workspace(),
            &AnnotationRecord::default(),
            Instant::now(),
        ))
        .unwrap();
        assert!(!saved);
        assert!(!block_on(manager.storage().exists(WORKSPACE_KEY)).unwrap());
    }

    #[test]
    fn test_autosave_roundtrip() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let annotations = AnnotationRecord {
            canvas_state_history: vec![CanvasState::empty()],
            history_index: 0,
        };

        manager.mark_dirty();
        assert!(block_on(manager.maybe_save(&workspace(), &annotations, Instant::now())).unwrap());

        let mut reopened = AutoSaveManager::new(storage);
        let loaded = block_on(reopened.load_workspace()).unwrap();
        assert_eq!(loaded, Some(workspace()));
        let history = block_on(reopened.load_annotations()).unwrap();
        assert_eq!(history, Some(annotations));
    }

    #[test]
    fn test_load_empty_storage() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        assert!(block_on(manager.load_workspace()).unwrap().is_none());
        assert!(block_on(manager.load_annotations()).unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_records() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        block_on(manager.save(&workspace(), &AnnotationRecord::default(), Instant::now())).unwrap();
        block_on(manager.clear()).unwrap();
        assert!(block_on(manager.storage().list()).unwrap().is_empty());
    }
}
