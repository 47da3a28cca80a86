//! File-backed persistence with atomic replace.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::CacheStore;

/// Default file name for the persisted store.
const DEFAULT_FILE_NAME: &str = "cache.json";

/// Errors that can occur during store persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read the store file.
    #[error("Failed to read store file '{path}': {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the store file.
    #[error("Failed to write store file '{path}': {source}")]
    Write {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete the store file.
    #[error("Failed to delete store file '{path}': {source}")]
    Delete {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Persisted bytes could not be decoded.
    #[error("Corrupt store file '{path}': {source}")]
    Corrupt {
        /// The path holding the undecodable bytes.
        path: PathBuf,
        /// The underlying decode error.
        source: serde_json::Error,
    },

    /// Failed to serialize the store.
    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Handle to a file-backed cache store.
///
/// The handle is cheap to clone; clones share one async mutex that
/// serializes the load-merge-save critical section for the underlying
/// file. Open a store once and clone the handle; opening the same path
/// twice creates independent locks and is not supported.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Creates a handle for the store at the given path.
    ///
    /// Does not touch the disk; the file is created on first save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a handle at the default platform location.
    ///
    /// Uses the `directories` crate to find the data directory:
    /// - Linux: `~/.local/share/lacuna/cache.json`
    /// - macOS: `~/Library/Application Support/lacuna/cache.json`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\lacuna\cache.json`
    ///
    /// Falls back to `~/.lacuna/cache.json` if the platform-specific
    /// location cannot be determined.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = Self::default_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self::open(dir.join(DEFAULT_FILE_NAME)))
    }

    /// Returns the default directory for lacuna store files.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        ProjectDirs::from("", "", "lacuna").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Returns the path of the persisted store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a persisted store file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the mutex guarding this store file.
    ///
    /// All load-merge-save sequences for the file must run while holding
    /// this lock.
    #[must_use]
    pub fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    /// Returns when the persisted store was last written, if it exists.
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    /// Loads the persisted store.
    ///
    /// A missing file is not an error: it yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the persisted bytes cannot be
    /// decoded, or [`StoreError::Read`] on I/O failure.
    pub fn load(&self) -> Result<CacheStore, StoreError> {
        if !self.path.exists() {
            return Ok(CacheStore::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        let store: CacheStore =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(
            path = %self.path.display(),
            series = store.series_count(),
            records = store.record_count(),
            "loaded store"
        );
        Ok(store)
    }

    /// Durably persists the full store, replacing prior content atomically.
    ///
    /// The store is serialized to a temporary file in the destination
    /// directory and renamed over the target, so a crash leaves either the
    /// old or the new complete file.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or I/O failure. The in-memory
    /// store is still valid; callers may retry on a later request.
    pub fn save(&self, store: &CacheStore) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let json = serde_json::to_string_pretty(store)?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        temp.write_all(json.as_bytes())
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        temp.persist(&self.path).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(
            path = %self.path.display(),
            series = store.series_count(),
            records = store.record_count(),
            "persisted store"
        );
        Ok(())
    }

    /// Deletes the persisted store entirely.
    ///
    /// Idempotent: succeeds if no persisted state exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store file cannot be deleted.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared store");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Returns the directory holding the store file.
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Fallback for determining the home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".lacuna")
}
