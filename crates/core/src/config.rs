//! Project configuration: an optional `.kiln/config.toml` under a project
//! root, naming include paths and system include roots for `CProject`.
//!
//! Absence of the file is not an error — callers get an empty
//! [`ProjectConfig`] and are expected to fall back to sensible defaults,
//! the way `oddjobs`' namespace resolution falls back to a directory name.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    pub include_paths: Vec<PathBuf>,
    pub system_roots: Vec<PathBuf>,
}

/// Load `<project_root>/.kiln/config.toml`, if it exists and parses.
///
/// A missing file yields the default (empty) config. A present-but-
/// unparseable file also yields the default config, after logging a
/// warning — configuration is a convenience layer, not load-bearing for
/// correctness, so it never aborts a build.
pub fn load_project_config(project_root: &Path) -> ProjectConfig {
    let path = project_root.join(".kiln").join("config.toml");
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return ProjectConfig::default();
    };

    let table: toml::Table = match raw.parse() {
        Ok(table) => table,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not parse project config");
            return ProjectConfig::default();
        }
    };

    let project = table.get("project").and_then(toml::Value::as_table);

    let include_paths = project
        .and_then(|t| t.get("include_paths"))
        .and_then(toml::Value::as_array)
        .map(|values| paths_from_toml(values, project_root))
        .unwrap_or_default();

    let system_roots = project
        .and_then(|t| t.get("system_roots"))
        .and_then(toml::Value::as_array)
        .map(|values| paths_from_toml(values, project_root))
        .unwrap_or_default();

    ProjectConfig {
        include_paths,
        system_roots,
    }
}

fn paths_from_toml(values: &[toml::Value], project_root: &Path) -> Vec<PathBuf> {
    values
        .iter()
        .filter_map(toml::Value::as_str)
        .map(|s| {
            let p = PathBuf::from(s);
            if p.is_absolute() {
                p
            } else {
                project_root.join(p)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
