//! Filesystem abstraction the rest of the workspace reads mtimes and
//! source text through, so tests never have to touch real disk timing.

use std::io;
use std::path::Path;

pub trait Filesystem: Send + Sync {
    /// A token that changes if and only if the file's contents may have
    /// changed since the last observation. The real implementation uses
    /// the modification time; it is never parsed, only compared.
    fn mtime_token(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn mtime_token(&self, path: &Path) -> io::Result<String> {
        let modified = std::fs::metadata(path)?.modified()?;
        let since_epoch = modified
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Ok(format!(
            "{}.{}",
            since_epoch.as_secs(),
            since_epoch.subsec_nanos()
        ))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFilesystem;

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
