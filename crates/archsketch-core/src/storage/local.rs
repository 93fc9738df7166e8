//! Browser localStorage implementation for WASM.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use wasm_bindgen::JsValue;
use web_sys::Storage as WebStorage;

/// Storage backed by `window.localStorage`.
///
/// Keys are stored as `<prefix><key>`; `list` only reports keys carrying
/// the prefix, with the prefix stripped.
pub struct LocalStorage {
    prefix: String,
}

impl LocalStorage {
    /// Storage using the record keys as-is.
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn backend(&self) -> StorageResult<WebStorage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| StorageError::Other("localStorage unavailable".to_string()))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn js_error(e: JsValue) -> StorageError {
    StorageError::Other(format!("localStorage error: {:?}", e))
}

impl Storage for LocalStorage {
    fn save(&self, key: &str, value: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = self.full_key(key);
        let value = value.to_string();
        Box::pin(async move {
            // Quota errors surface here
            self.backend()?.set_item(&key, &value).map_err(|e| {
                log::warn!("Failed to write {}: {:?}", key, e);
                StorageError::Io(format!("Failed to write {}", key))
            })
        })
    }

    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<String>> {
        let full = self.full_key(key);
        let key = key.to_string();
        Box::pin(async move {
            self.backend()?
                .get_item(&full)
                .map_err(js_error)?
                .ok_or(StorageError::NotFound(key))
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = self.full_key(key);
        Box::pin(async move { self.backend()?.remove_item(&key).map_err(js_error) })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let backend = self.backend()?;
            let len = backend.length().map_err(js_error)?;
            let mut keys = Vec::new();
            for i in 0..len {
                if let Some(key) = backend.key(i).map_err(js_error)? {
                    if let Some(stripped) = key.strip_prefix(self.prefix.as_str()) {
                        keys.push(stripped.to_string());
                    }
                }
            }
            Ok(keys)
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let key = self.full_key(key);
        Box::pin(async move {
            Ok(self.backend()?.get_item(&key).map_err(js_error)?.is_some())
        })
    }
}
