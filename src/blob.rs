//! Blob store adapter for rendered problem images.
//!
//! Object names are content addressed: the SHA-256 of the rendered board state,
//! optionally suffixed with the highlighted square, so re-rendering an identical
//! position overwrites the same object instead of leaking a new one.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::BlobError;

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `bytes` under `name` with public read access. Returns the public URL.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, BlobError>;

    /// Remove `name`. Returns `Err(BlobError::NotFound)` when it does not exist.
    async fn delete(&self, name: &str) -> Result<(), BlobError>;
}

pub fn object_name(state_key: &str, highlight: Option<&str>) -> String {
    let digest = Sha256::digest(state_key.as_bytes());
    let mut name = format!("{digest:x}");
    if let Some(h) = highlight {
        name.push('-');
        name.push_str(h);
    }
    name.push_str(".png");
    name
}

/// Recover the object name from a stored public URL (its last path segment).
pub fn object_name_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn public_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Blobs kept in process memory. Used when no blob directory is configured.
pub struct MemoryBlobStore {
    public_base: String,
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self { public_base: public_base.into(), objects: RwLock::new(HashMap::new()) }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.objects.read().await.contains_key(name)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, BlobError> {
        self.objects
            .write()
            .await
            .insert(name.to_string(), (content_type.to_string(), bytes));
        Ok(public_url(&self.public_base, name))
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        match self.objects.write().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound { name: name.to_string() }),
        }
    }
}

/// Blobs written to a local directory that the HTTP layer serves under `/images`.
pub struct FsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self { root: root.into(), public_base: public_base.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, BlobError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(BlobError::Backend(format!("invalid object name: {name}")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, BlobError> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;
        debug!(target: "tsume_pool", %name, %content_type, size = bytes.len(), "Blob written");
        Ok(public_url(&self.public_base, name))
    }

    async fn delete(&self, name: &str) -> Result<(), BlobError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound { name: name.to_string() })
            }
            Err(e) => Err(BlobError::Backend(e.to_string())),
        }
    }
}
