use super::Filesystem;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory [`Filesystem`] for tests: files exist only once `set_file` or
/// `touch` has been called, and mtime tokens are whatever string the test
/// assigned rather than real clock values.
#[derive(Default)]
pub struct FakeFilesystem {
    mtimes: Mutex<HashMap<PathBuf, String>>,
    contents: Mutex<HashMap<PathBuf, String>>,
}

impl FakeFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file(
        &self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        mtime: impl Into<String>,
    ) {
        let path = path.into();
        self.contents.lock().insert(path.clone(), content.into());
        self.mtimes.lock().insert(path, mtime.into());
    }

    pub fn touch(&self, path: impl Into<PathBuf>, mtime: impl Into<String>) {
        self.mtimes.lock().insert(path.into(), mtime.into());
    }
}

impl Filesystem for FakeFilesystem {
    fn mtime_token(&self, path: &Path) -> io::Result<String> {
        self.mtimes
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such fake file"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.mtimes.lock().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.contents
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such fake file"))
    }
}
