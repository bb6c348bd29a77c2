//! `CDependencyStep`: makes a C/C++ source file depend on every header it
//! (transitively) includes, so the engine re-evaluates downstream steps
//! whenever any of them changes.
//!
//! A structural port of `original_source/pysbs/c/deps.py`: the same
//! `INCLUDE_RE`, the same `C_EXCLUDED_ZONES` (`/* */` and `// \n` ignored
//! by the parser, `" "` with escapes and parser-significant), the same
//! include-cache-version freshness check, and the same postinit recursion
//! guarded by `CProject::is_not_part_of_project`.

use crate::cproject::CProject;
use async_trait::async_trait;
use kiln_core::scan::{find_matches, ExcludedZoneSpec};
use kiln_core::Filesystem;
use kiln_engine::{Step, StepRegistry, StepState};
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

// Allow expect here as the pattern is a compile-time constant, verified valid.
#[allow(clippy::expect_used)]
fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"#include ((?:<[^>]+>)|(?:"[^"]+"))"#).expect("static pattern is valid")
    })
}

// Allow expect here as each zone's delimiters are compile-time constants,
// verified non-empty.
#[allow(clippy::expect_used)]
fn c_excluded_zones() -> Vec<ExcludedZoneSpec> {
    vec![
        ExcludedZoneSpec::new("/*", "*/", false, true).expect("static zone spec is valid"),
        ExcludedZoneSpec::new("//", "\n", false, true).expect("static zone spec is valid"),
        ExcludedZoneSpec::new("\"", "\"", true, false).expect("static zone spec is valid"),
    ]
}

/// Strip the surrounding `<...>` or `"..."` off a raw `#include` capture.
fn strip_brackets(literal: &str) -> String {
    let bytes = literal.as_bytes();
    if bytes.len() >= 2 {
        literal[1..literal.len() - 1].to_string()
    } else {
        literal.to_string()
    }
}

/// A `Step` whose only purpose is to force re-evaluation of anything
/// depending on it when `path`, or any header it transitively includes,
/// changes. It performs no compilation.
pub struct CDependencyStep {
    state: StepState,
    project: Arc<CProject>,
    path: PathBuf,
    filesystem: Arc<dyn Filesystem>,
}

impl CDependencyStep {
    pub fn new(project: Arc<CProject>, path: PathBuf, filesystem: Arc<dyn Filesystem>) -> Self {
        Self {
            state: StepState::new(),
            project,
            path,
            filesystem,
        }
    }

    fn compute_includes(&self) -> Vec<String> {
        let Ok(source) = self.filesystem.read_to_string(&self.path) else {
            tracing::warn!(path = %self.path.display(), "could not read file to scan includes");
            return Vec::new();
        };

        find_matches(&source, &c_excluded_zones(), include_regex(), true)
            .iter()
            .filter_map(|m| m.group(1))
            .map(strip_brackets)
            .collect()
    }
}

#[async_trait]
impl Step for CDependencyStep {
    fn state(&self) -> &StepState {
        &self.state
    }

    fn step_id(&self) -> String {
        format!("CDependencyStep {{ {} }}", self.path.display())
    }

    fn input_version(&self) -> String {
        self.filesystem.mtime_token(&self.path).unwrap_or_default()
    }

    fn post_init(&self, registry: &StepRegistry) {
        if self.project.is_not_part_of_project(&self.path) {
            return;
        }

        let version = self.input_version();
        let cached_version: String = self.state.get_or("include_cache_version", String::new());

        let includes: Vec<String> = if version == cached_version {
            self.state.get_or("includes", Vec::new())
        } else {
            let includes = self.compute_includes();
            let _ = self.state.set_persisted("includes", &includes);
            let _ = self.state.set_persisted("include_cache_version", &version);
            includes
        };

        for include in &includes {
            match self.project.resolve_include(&self.path, include, self.filesystem.as_ref()) {
                Some(resolved) => {
                    if !self.project.is_not_part_of_project(&resolved) {
                        let child = CDependencyStep::new(
                            Arc::clone(&self.project),
                            resolved,
                            Arc::clone(&self.filesystem),
                        );
                        let child = registry.intern(child);
                        self.state.add_dependency(child);
                    }
                }
                None => {
                    tracing::warn!(
                        include = %include,
                        file = %self.path.display(),
                        "could not resolve include"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "cdeps_tests.rs"]
mod tests;
