//! Key-value blob stores.
//!
//! A blob is an opaque UTF-8 string under a short key. [`FileBlobStore`]
//! keeps one `<key>.json` file per blob and writes atomically (temp file,
//! then rename) so a crash mid-write never leaves a torn blob. [`MemoryBlobStore`] is a shared in-process map.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by blob stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid blob key {0:?}")]
    InvalidKey(String),

    #[error("blob {key} at {path}: {source}")]
    Io {
        key: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opaque key-value blob storage.
pub trait BlobStore: Send + Sync {
    /// Load a blob. A missing blob is `Ok(None)`, not an error.
    fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a blob, replacing any previous value.
    fn save(&self, key: &str, payload: &str) -> StoreResult<()>;

    /// Remove a blob. Returns whether it existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;
}

fn check_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One JSON file per blob inside a state directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    fn save(&self, key: &str, payload: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let io_err = |path: &Path, source| StoreError::Io {
            key: key.to_string(),
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(|source| io_err(&self.dir, source))?;
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, payload).map_err(|source| io_err(&temp, source))?;
        std::fs::rename(&temp, &path).map_err(|source| io_err(&path, source))?;
        tracing::trace!(key, path = %path.display(), bytes = payload.len(), "blob saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Shared in-memory store. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without counting it as a save.
    pub fn insert(&self, key: impl Into<String>, payload: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = entries.insert(key.into(), payload.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Number of successful `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        check_key(key)?;
        Ok(self.get(key))
    }

    fn save(&self, key: &str, payload: &str) -> StoreResult<()> {
        check_key(key)?;
        self.insert(key, payload);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        check_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
