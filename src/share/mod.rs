//! Snapshot sharing
//!
//! `share` serializes the schema document to YAML, picks a fresh random id,
//! and hands the file to an [`Uploader`] under `<prefix>/<id>.<extension>`.
//! Every call uploads a new snapshot: there is no caching, deduplication,
//! retry or collision check. With 21 characters from a 64-symbol alphabet
//! (126 bits) collisions are treated as an accepted risk.
//!
//! Storage is pluggable:
//! - [`MemoryStore`] for tests and in-process use
//! - [`LocalDirStore`] writes under a directory (native only)
//! - [`HttpStore`] PUT/GET against an object store URL (native only)

pub mod store;

#[cfg(not(target_arch = "wasm32"))]
pub mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpStore;
#[cfg(not(target_arch = "wasm32"))]
pub use store::LocalDirStore;
pub use store::MemoryStore;

use async_trait::async_trait;
use rand::Rng;

use crate::config::{ShareConfig, MIN_SHARE_ID_LENGTH};
use crate::error::{ShareError, UploadError};
use crate::schema::Schema;

/// URL-safe id alphabet.
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

// =============================================================================
// COLLABORATORS
// =============================================================================

/// A named, typed document handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    /// Object path, e.g. `shapes/<id>.yaml`
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// External store that accepts shared documents.
///
/// Only success or failure matters to the caller; retries, if any, belong
/// to the implementation.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: SharedFile) -> Result<(), UploadError>;
}

/// Read side of a store, used to open a shared snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>, UploadError>;
}

#[async_trait]
impl<T: Uploader + ?Sized> Uploader for std::sync::Arc<T> {
    async fn upload(&self, file: SharedFile) -> Result<(), UploadError> {
        (**self).upload(file).await
    }
}

#[async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<T> {
    async fn download(&self, path: &str) -> Result<Vec<u8>, UploadError> {
        (**self).download(path).await
    }
}

// =============================================================================
// SHARE SERVICE
// =============================================================================

/// Immutable capture of a schema document under its share id.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub document: Schema,
}

impl Snapshot {
    /// Copy `document` under a fresh id. Later edits to the source do not
    /// reach the snapshot.
    pub fn capture(document: &Schema, id_length: usize) -> Self {
        Self {
            id: generate_id(id_length),
            document: document.clone(),
        }
    }

    /// YAML file for the store, at `<prefix>/<id>.<extension>`.
    pub fn to_file(&self, config: &ShareConfig) -> Result<SharedFile, ShareError> {
        let yaml = self.document.to_yaml_string().map_err(ShareError::Serialize)?;
        Ok(SharedFile {
            name: object_path(config, &self.id),
            content_type: config.content_type.clone(),
            content: yaml.into_bytes(),
        })
    }
}

/// Result of a successful share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareHandle {
    pub id: String,
    /// Object path the document was stored under.
    pub path: String,
    /// Link for the user, `<link_base>?s=<id>`.
    pub link: String,
}

/// Share flow over an uploader. Holds no per-share state, so concurrent
/// calls are independent.
pub struct ShareService<U> {
    uploader: U,
    config: ShareConfig,
}

impl<U: Uploader> ShareService<U> {
    pub fn new(uploader: U, config: &ShareConfig) -> Self {
        Self {
            uploader,
            config: config.clone(),
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Capture `schema` under a fresh id and package it. No I/O.
    pub fn snapshot(&self, schema: &Schema) -> Result<(Snapshot, SharedFile), ShareError> {
        let snapshot = Snapshot::capture(schema, self.config.id_length);
        let file = snapshot.to_file(&self.config)?;
        Ok((snapshot, file))
    }

    /// Snapshot the schema and upload it. Upload failures are returned as
    /// they are; the caller decides whether to try again.
    pub async fn share(&self, schema: &Schema) -> Result<ShareHandle, ShareError> {
        let (Snapshot { id, .. }, file) = self.snapshot(schema)?;
        let path = file.name.clone();
        let bytes = file.content.len();

        if let Err(source) = self.uploader.upload(file).await {
            tracing::warn!(%path, error = %source, "snapshot upload failed");
            return Err(ShareError::Upload { path, source });
        }

        tracing::info!(%id, %path, bytes, "schema shared");
        Ok(ShareHandle {
            link: share_link(&self.config, &id),
            id,
            path,
        })
    }
}

/// Fetch and parse a shared snapshot by id.
pub async fn load_shared<S: SnapshotSource + ?Sized>(
    source: &S,
    config: &ShareConfig,
    id: &str,
) -> Result<Schema, ShareError> {
    if !is_valid_id(id) {
        return Err(ShareError::InvalidId(id.to_string()));
    }

    let path = object_path(config, id);
    let bytes = source
        .download(&path)
        .await
        .map_err(|source| ShareError::Fetch {
            path: path.clone(),
            source,
        })?;

    let schema = Schema::from_yaml_slice(&bytes)
        .map_err(|source| ShareError::Deserialize { path: path.clone(), source })?;

    tracing::debug!(%id, %path, "loaded shared schema");
    Ok(schema)
}

// =============================================================================
// IDS AND PATHS
// =============================================================================

/// Random id of `len` URL-safe characters (at least the minimum length).
pub fn generate_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len.max(MIN_SHARE_ID_LENGTH))
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Ids that could have come from [`generate_id`]. Also keeps ids from
/// escaping the path prefix.
pub fn is_valid_id(id: &str) -> bool {
    id.len() >= MIN_SHARE_ID_LENGTH && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

pub fn object_path(config: &ShareConfig, id: &str) -> String {
    format!(
        "{}/{}.{}",
        config.path_prefix.trim_end_matches('/'),
        id,
        config.extension
    )
}

pub fn share_link(config: &ShareConfig, id: &str) -> String {
    format!("{}?s={}", config.link_base, id)
}
