//! Local filesystem blob store.
//!
//! Blobs are stored as flat files under a root directory.  The storage
//! key is used directly as a relative path, so slash-delimited keys
//! become nested directories which are created on demand.
//!
//! Writes go through a temp file + rename so a crashed write never
//! leaves a half-written blob at its final path.

use bytes::Bytes;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;

use super::backend::StorageBackend;

/// Stores blobs on the local filesystem.
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Owns the backing temp directory in ephemeral mode so it is
    /// removed when the store is dropped.
    _tempdir: Option<tempfile::TempDir>,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _tempdir: None,
        })
    }

    /// Create a store backed by a fresh temp directory.
    ///
    /// The directory lives as long as the store; nothing survives drop.
    pub fn ephemeral() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self {
            root: dir.path().to_path_buf(),
            _tempdir: Some(dir),
        })
    }

    /// Resolve a storage key to a path under the root.
    ///
    /// Rejects keys with `..` components or absolute paths so a key can
    /// never escape the root directory.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let relative = std::path::Path::new(key);
        if relative.is_absolute() {
            anyhow::bail!("absolute path not allowed in storage key: {key}");
        }
        for component in relative.components() {
            if matches!(component, std::path::Component::ParentDir) {
                anyhow::bail!("path traversal detected in storage key: {key}");
            }
        }
        Ok(self.root.join(relative))
    }
}

impl StorageBackend<Bytes> for LocalBlobStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            match std::fs::read(&path) {
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put(
        &self,
        key: &str,
        value: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&key)?;

            // Slash-delimited keys imply intermediate directories.
            if let Some(parent) = final_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
            tmp.write_all(&value)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&final_path).map_err(|e| e.error)?;

            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                // Idempotent: deleting a missing blob is fine.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
