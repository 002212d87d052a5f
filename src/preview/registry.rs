//! Preview registry: the id → dataset path mapping shared by all requests.
//!
//! # Lifecycle
//!
//! - Created empty with [`PreviewRegistry::new`] and shared behind an `Arc`.
//! - Entries are added or fully replaced by [`PreviewRegistry::register`].
//! - There is no removal and no eviction; entries live as long as the
//!   registry does.
//!
//! The map sits behind a single `RwLock`, so a reader sees either the old or
//! the new path for an id, never a partial update. A registered path is only
//! checked at registration; if the file disappears later, opening it fails
//! when a tile or bounds request arrives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::dataset::{Dataset, GeoBounds};
use crate::error::PreviewError;

/// A registered preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub id: String,
    pub path: PathBuf,
}

/// Process-wide mapping from preview id to absolute dataset path.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under `id`, replacing any previous entry.
    ///
    /// Both values are trimmed. The path is made absolute and must name an
    /// existing regular file; otherwise nothing is changed.
    pub async fn register(&self, id: &str, path: &str) -> Result<PreviewEntry, PreviewError> {
        let id = id.trim();
        let path = path.trim();
        if id.is_empty() || path.is_empty() {
            return Err(PreviewError::Validation(
                "id and path are required".to_string(),
            ));
        }

        let absolute = absolute_path(Path::new(path));
        let is_file = tokio::fs::metadata(&absolute)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(PreviewError::NotFound {
                path: absolute.display().to_string(),
            });
        }

        let previous = self
            .entries
            .write()
            .await
            .insert(id.to_string(), absolute.clone());

        info!(
            id,
            path = %absolute.display(),
            replaced = previous.is_some(),
            "registered preview"
        );

        Ok(PreviewEntry {
            id: id.to_string(),
            path: absolute,
        })
    }

    /// Absolute path registered under `id`.
    pub async fn resolve(&self, id: &str) -> Result<PathBuf, PreviewError> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PreviewError::UnknownId { id: id.to_string() })
    }

    /// Geographic extent of the dataset registered under `id`.
    pub async fn bounds(&self, id: &str) -> Result<GeoBounds, PreviewError> {
        let path = self.resolve(id).await?;
        let dataset = Dataset::open(&path).await?;
        Ok(dataset.geographic_bounds())
    }

    /// Number of registered previews.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Make `path` absolute against the working directory without touching the
/// filesystem. Falls back to the path as given if the cwd is unavailable.
fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
