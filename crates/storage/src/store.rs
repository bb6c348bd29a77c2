//! The keyed blob store backing [`crate::Namespace`].
//!
//! [`JsonFileStore`] keeps the whole map in memory and rewrites it to disk
//! on every mutation, atomically, the way `oddjobs`' snapshot persistence
//! does: write to a sibling `.tmp` file, `sync_all`, then rename over the
//! real path. A write never leaves a half-written file behind.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to persist store: {0}")]
    Persist(#[from] std::io::Error),
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A keyed blob store with `get`/`set`/`delete-by-prefix`/`sync`.
pub trait Store: Send + Sync {
    fn get_raw(&self, key: &str) -> Option<serde_json::Value>;
    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
    fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError>;
    fn sync(&self) -> Result<(), StoreError>;
}

/// A [`Store`] backed by a single JSON file holding the entire key→value
/// map. Simple and sufficient for a build engine's cache: the map is
/// small, writes are infrequent relative to a compiler invocation, and
/// durability matters far more than write throughput.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<HashMap<String, serde_json::Value>>,
}

impl JsonFileStore {
    /// Open or create the store at `path`. An existing file that fails to
    /// parse is rotated to `.bak` and the store starts fresh, mirroring
    /// how a corrupt persisted cache should never block a build.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Unavailable { path: path.clone(), source })?;
        }

        let data = if path.exists() {
            let file = File::open(&path)
                .map_err(|source| StoreError::Unavailable { path: path.clone(), source })?;
            match serde_json::from_reader(BufReader::new(file)) {
                Ok(data) => data,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "corrupt store, moving to .bak and starting fresh");
                    let bak = path.with_extension("bak");
                    fs::rename(&path, &bak)
                        .map_err(|source| StoreError::Unavailable { path: path.clone(), source })?;
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    fn persist(&self, data: &HashMap<String, serde_json::Value>) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, data)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn get_raw(&self, key: &str) -> Option<serde_json::Value> {
        self.data.lock().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        data.insert(key.to_string(), value);
        self.persist(&data)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        data.retain(|k, _| !k.starts_with(prefix));
        self.persist(&data)
    }

    fn sync(&self) -> Result<(), StoreError> {
        let data = self.data.lock();
        self.persist(&data)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
