//! Snapshot stores
//!
//! Both stores implement [`Uploader`] and [`SnapshotSource`], so a document
//! shared through one can be opened through the same store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{SharedFile, SnapshotSource, Uploader};
use crate::error::UploadError;

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Stored object with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub content: Vec<u8>,
}

/// In-process store keyed by object path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(path).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

fn poisoned() -> UploadError {
    UploadError::Storage("memory store lock poisoned".into())
}

#[async_trait]
impl Uploader for MemoryStore {
    async fn upload(&self, file: SharedFile) -> Result<(), UploadError> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(
            file.name,
            StoredObject {
                content_type: file.content_type,
                content: file.content,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for MemoryStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, UploadError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(path)
            .map(|object| object.content.clone())
            .ok_or_else(|| UploadError::NotFound(path.to_string()))
    }
}

// =============================================================================
// LOCAL DIRECTORY STORE
// =============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use local::LocalDirStore;

#[cfg(not(target_arch = "wasm32"))]
mod local {
    use std::path::{Component, Path, PathBuf};

    use async_trait::async_trait;

    use super::super::{SharedFile, SnapshotSource, Uploader};
    use crate::error::UploadError;

    /// Writes each document to `<base>/<object path>`.
    #[derive(Debug, Clone)]
    pub struct LocalDirStore {
        base_path: PathBuf,
    }

    impl LocalDirStore {
        pub fn new(base_path: impl Into<PathBuf>) -> Self {
            Self {
                base_path: base_path.into(),
            }
        }

        pub fn base_path(&self) -> &Path {
            &self.base_path
        }

        /// Resolve an object path, refusing anything that would leave the base directory.
        fn path_for_key(&self, key: &str) -> Result<PathBuf, UploadError> {
            let relative = Path::new(key);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if key.is_empty() || escapes {
                return Err(UploadError::Storage(format!("invalid object path: {}", key)));
            }
            Ok(self.base_path.join(relative))
        }
    }

    #[async_trait]
    impl Uploader for LocalDirStore {
        async fn upload(&self, file: SharedFile) -> Result<(), UploadError> {
            let path = self.path_for_key(&file.name)?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            tokio::fs::write(&path, &file.content).await?;
            tracing::debug!(path = %path.display(), content_type = %file.content_type, "stored snapshot");
            Ok(())
        }
    }

    #[async_trait]
    impl SnapshotSource for LocalDirStore {
        async fn download(&self, key: &str) -> Result<Vec<u8>, UploadError> {
            let path = self.path_for_key(key)?;

            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(UploadError::NotFound(key.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
