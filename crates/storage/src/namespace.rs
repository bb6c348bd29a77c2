//! The `Namespace` handle: a prefixed, escape-encoded view over a
//! [`Store`], giving the rest of the workspace a hierarchical key space
//! over a flat backend.
//!
//! Grounded on `original_source/pysbs/core/config.py::PersistentNamespace`:
//! same escape rule (`\` -> `\\`, then `|` -> `\|`), same prefix
//! concatenation (`prefix + "|" + escape(key)`), same `sync()`-on-write
//! contract.

use crate::store::{Store, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

fn escape(segment: &str) -> String {
    segment.replace('\\', "\\\\").replace('|', "\\|")
}

/// A prefixed view over a [`Store`]. Cheap to clone: it is just a prefix
/// string and a shared reference to the backing store.
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn Store>,
    prefix: String,
}

impl Namespace {
    /// The root namespace of `store` (empty prefix).
    pub fn root(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            prefix: String::new(),
        }
    }

    /// A child namespace, whose prefix is this namespace's prefix joined
    /// with the escaped `name`.
    pub fn sub(&self, name: &str) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: format!("{}|{}", self.prefix, escape(name)),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}|{}", self.prefix, escape(key))
    }

    /// Read `key`, deserialized as `T`, or `None` if absent or of the
    /// wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store
            .get_raw(&self.full_key(key))
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Read `key`, falling back to `default` if absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Write `key := value`, flushing synchronously.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), StoreError> {
        let raw = serde_json::to_value(value)?;
        self.store.set_raw(&self.full_key(key), raw)
    }

    /// Remove every key under this namespace's prefix.
    pub fn drop_all(&self) -> Result<(), StoreError> {
        self.store.delete_prefix(&format!("{}|", self.prefix))
    }

    /// Force a flush of the backing store.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.store.sync()
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
