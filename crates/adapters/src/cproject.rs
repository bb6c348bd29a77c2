//! `CProject`: shared configuration for all steps compiling one C/C++
//! project -- include paths, the project boundary, and system roots that
//! should be treated as opaque.
//!
//! Grounded on `original_source/pysbs/c/project.py::CProject`
//! (`resolve_include`'s "file's own directory first, then each configured
//! include path in order" precedence, `spec.md` §8 scenario 6). `pysbs/c/
//! deps.py` calls `self.project.is_not_part_of_project(self.path)`, a
//! method absent from the retrieved `project.py` -- a divergent-version
//! gap `spec.md` §9 warns about. Resolved here by adding `project_root`
//! and `system_roots`, with `is_not_part_of_project` true for anything
//! outside `project_root` or under a `system_root`, matching `spec.md`
//! §4.4 step 1 ("If P lies under any configured system include root, do
//! nothing").

use std::path::{Path, PathBuf};

/// Common configuration for compiling one C/C++ project: where to look
/// for headers, and which files are considered part of the project at
/// all.
#[derive(Debug, Clone)]
pub struct CProject {
    pub project_root: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub system_roots: Vec<PathBuf>,
}

impl CProject {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            include_paths: Vec::new(),
            system_roots: Vec::new(),
        }
    }

    pub fn with_include_paths(mut self, include_paths: Vec<PathBuf>) -> Self {
        self.include_paths = include_paths;
        self
    }

    pub fn with_system_roots(mut self, system_roots: Vec<PathBuf>) -> Self {
        self.system_roots = system_roots;
        self
    }

    /// Resolve an include literal (already stripped of `<>`/`""`) written
    /// in `file`. Tries `file`'s own directory first, then each
    /// configured include path in order; returns the first path that
    /// exists on disk that a [`kiln_core::Filesystem`] reports, else
    /// `None`.
    pub fn resolve_include(
        &self,
        file: &Path,
        included: &str,
        filesystem: &dyn kiln_core::Filesystem,
    ) -> Option<PathBuf> {
        let search_dirs = std::iter::once(file.parent().unwrap_or(Path::new(".")).to_path_buf())
            .chain(self.include_paths.iter().cloned());

        for dir in search_dirs {
            let candidate = dir.join(included);
            if filesystem.exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// True when `path` lies outside the project root, or under any
    /// configured system include root -- in either case, the step graph
    /// should stop recursing: there is nothing of ours to track changes
    /// in.
    pub fn is_not_part_of_project(&self, path: &Path) -> bool {
        if !path.starts_with(&self.project_root) {
            return true;
        }
        self.system_roots.iter().any(|root| path.starts_with(root))
    }
}

#[cfg(test)]
#[path = "cproject_tests.rs"]
mod tests;
