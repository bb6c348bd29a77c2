//! Shared fixtures for the `kiln` integration suite.

use kiln_core::filesystem::FakeFilesystem;
use kiln_storage::{JsonFileStore, Namespace, Store};
use std::sync::Arc;

/// A freshly opened, on-disk-backed root namespace. The `TempDir` must be
/// kept alive for as long as the namespace is used.
pub fn fresh_registry_root() -> (tempfile::TempDir, Namespace) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn Store> = Arc::new(JsonFileStore::open(dir.path().join("store.json")).expect("open store"));
    (dir, Namespace::root(store))
}

pub fn fake_fs() -> Arc<FakeFilesystem> {
    Arc::new(FakeFilesystem::new())
}
