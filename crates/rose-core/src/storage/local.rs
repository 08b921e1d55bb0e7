//! Local key-value store
//!
//! Each key holds one whole collection serialized as a JSON blob in
//! `<data_dir>/<key>.json`. Every save rewrites the blob atomically (write to
//! a temp file, sync, rename); there are no partial writes and no schema
//! version tag.
//!
//! Keys:
//! - `rose_db_tasks` - task list
//! - `rose_db_messages` - chat messages
//! - `rose_db_docs` - document registry
//! - `rose_cloud_config` - cloud endpoint settings

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};

pub const TASKS_KEY: &str = "rose_db_tasks";
pub const MESSAGES_KEY: &str = "rose_db_messages";
pub const DOCUMENTS_KEY: &str = "rose_db_docs";
pub const CLOUD_CONFIG_KEY: &str = "rose_cloud_config";

/// Suffix given to blobs that failed to deserialize
const CORRUPT_SUFFIX: &str = "corrupt";

/// Directory-backed key-value store
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self { dir })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a key
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Whether a blob exists for the key
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.exists()).unwrap_or(false)
    }

    /// Load the value stored under `key`
    ///
    /// Returns `None` if nothing has been saved yet and
    /// [`StorageError::CorruptBlob`] if the blob does not deserialize.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|source| StorageError::ReadError {
            path: path.clone(),
            source,
        })?;

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::CorruptBlob {
                key: key.to_string(),
                path,
                details: e.to_string(),
            })
    }

    /// Load the value under `key`, falling back to `default` when absent
    ///
    /// A malformed blob is moved aside to `<key>.json.corrupt` and replaced by
    /// the default. Read failures other than corruption are still returned.
    pub fn load_or_else<T, F>(&self, key: &str, default: F) -> StorageResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.load(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(default()),
            Err(StorageError::CorruptBlob { path, details, .. }) => {
                let quarantine = path.with_extension(format!("json.{}", CORRUPT_SUFFIX));
                warn!(
                    "Blob {:?} is malformed ({}); moving it to {:?} and starting from default",
                    path, details, quarantine
                );
                fs::rename(&path, &quarantine).map_err(|source| {
                    StorageError::AtomicWriteFailed {
                        from: path.clone(),
                        to: quarantine.clone(),
                        source,
                    }
                })?;
                Ok(default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load the value under `key` or its `Default`
    pub fn load_or_default<T>(&self, key: &str) -> StorageResult<T>
    where
        T: DeserializeOwned + Default,
    {
        self.load_or_else(key, T::default)
    }

    /// Serialize `value` and replace the blob under `key`
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;

        atomic_write(&path, &bytes)?;
        debug!("Saved {} ({} bytes)", key, bytes.len());
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
