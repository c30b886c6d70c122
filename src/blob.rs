//! Key-value blob storage.
//!
//! The [`BlobStore`] trait is the seam between the record store and where
//! bytes actually live. Each blob is a UTF-8 body plus a small metadata map
//! ([`DocumentMetadata`]). Backends:
//!
//! | Backend | Type | Notes |
//! |---------|------|-------|
//! | `filesystem` | [`FsBlobStore`] | body file + `.meta.json` sidecar |
//! | `s3` | [`S3BlobStore`](crate::blob_s3::S3BlobStore) | signed GET/PUT |
//! | `memory` | [`MemoryBlobStore`] | tests and ephemeral serving |
//!
//! Writes replace the whole blob. There is no versioning and no
//! compare-and-swap: the last writer wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::blob_s3::S3BlobStore;
use crate::config::{StoreBackend, StoreConfig};
use crate::models::DocumentMetadata;

/// A stored blob: body text plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub body: String,
    pub metadata: DocumentMetadata,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Blob>>;

    /// Create or overwrite a blob.
    async fn put(&self, key: &str, blob: Blob) -> Result<()>;

    /// Human-readable location, used in logs and CLI output.
    fn describe(&self) -> String;
}

/// Builds the backend selected by `[store].backend`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StoreBackend::Filesystem => Arc::new(FsBlobStore::new(&config.path)),
        StoreBackend::Memory => Arc::new(MemoryBlobStore::new()),
        StoreBackend::S3 => {
            let s3 = config
                .s3
                .clone()
                .context("store.s3 section is required for the s3 backend")?;
            Arc::new(S3BlobStore::from_env(s3)?)
        }
    };
    Ok(store)
}

// ============ Filesystem ============

/// Stores each blob as `<root>/<key>` with metadata in `<root>/<key>.meta.json`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn body_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.meta.json", key)))
    }
}

/// Keys are flat names; anything that could escape the root is refused.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
        bail!("invalid blob key: '{}'", key);
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Blob>> {
        let body_path = self.body_path(key)?;
        let body = match tokio::fs::read_to_string(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", body_path.display()))
            }
        };

        let meta_path = self.meta_path(key)?;
        let metadata = match tokio::fs::read_to_string(&meta_path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %meta_path.display(), error = %e, "ignoring unreadable blob metadata");
                DocumentMetadata::default()
            }),
            Err(_) => DocumentMetadata::default(),
        };

        Ok(Some(Blob { body, metadata }))
    }

    async fn put(&self, key: &str, blob: Blob) -> Result<()> {
        let body_path = self.body_path(key)?;
        let meta_path = self.meta_path(key)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        write_atomic(&body_path, blob.body.as_bytes()).await?;
        let meta = serde_json::to_vec_pretty(&blob.metadata)?;
        write_atomic(&meta_path, &meta).await?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }
}

/// Suffix source for temp files; unique per write within the process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write to a private sibling temp file, then rename over the target.
///
/// Each call gets its own temp file, so concurrent writers to one key never
/// share bytes and the rename publishes exactly one writer's content.
/// Temp names start with `.`, which keys may not, so they never collide
/// with stored blobs.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid blob path {}", path.display()))?;
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

// ============ Memory ============

/// In-memory blob store for tests and throwaway servers.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Blob>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| anyhow::anyhow!("memory blob store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, blob: Blob) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| anyhow::anyhow!("memory blob store lock poisoned"))?;
        blobs.insert(key.to_string(), blob);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
