//! Local-directory object store for offline runs.

use super::ObjectStore;
use crate::error::AssetError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Writes each key as a file under `root`, creating folders as needed.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a storage key to a path, refusing keys that would leave `root`.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || key.is_empty() {
            None
        } else {
            Some(self.root.join(relative))
        }
    }
}

#[async_trait]
impl ObjectStore for DirectoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), AssetError> {
        let upload_err = |detail: String| AssetError::Upload {
            key: key.to_string(),
            detail,
        };
        let path = self
            .path_for(key)
            .ok_or_else(|| upload_err("key escapes the storage directory".into()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_err(e.to_string()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| upload_err(e.to_string()))?;
        debug!("Stored {} bytes at {}", body.len(), path.display());
        Ok(())
    }
}
