//! The two-phase build engine: stale-set computation, then sequenced
//! execution with failure propagation.
//!
//! A direct structural port of
//! `original_source/pysbs/core/build.py::BuildManager`: the post-order
//! `_make_update_list` walk and staleness predicate, and `_run`'s
//! bump-then-reset-then-run-then-check-failed sequencing, including the
//! header banner and `BUILD_FAILED_MSG`/"All up to date" strings.

use crate::error::BuildError;
use crate::step::Step;
use std::collections::HashSet;
use std::sync::Arc;

const HEADER_PREFIX: &str = "----[ ";
const HEADER_SUFFIX: &str = " ]";
const HEADER_LEN: usize = 80;

const BUILD_FAILED_MSG: &str = "\nBuild failed";

fn print_header(name: &str) {
    println!();
    let filler_len = HEADER_LEN.saturating_sub(HEADER_PREFIX.len() + HEADER_SUFFIX.len());
    println!("{HEADER_PREFIX}{name}{HEADER_SUFFIX}{}", "-".repeat(filler_len));
    println!();
}

/// Drives a single build from a terminal step: computes the stale set,
/// then executes it strictly in order, stopping at the first failure.
pub struct BuildManager {
    last_step: Arc<dyn Step>,
}

impl BuildManager {
    pub fn new(last_step: Arc<dyn Step>) -> Self {
        Self { last_step }
    }

    /// Compute and execute the stale set. Returns `Ok(())` both when
    /// nothing needed updating and when every stale step ran clean.
    pub async fn build(&self) -> Result<(), BuildError> {
        let to_update = self.make_update_list();

        if to_update.is_empty() {
            println!("All up to date");
            return Ok(());
        }

        for step in &to_update {
            if let Err(err) = self.run_step(step).await {
                println!("{BUILD_FAILED_MSG}");
                return Err(err);
            }
        }

        Ok(())
    }

    /// Phase 1: a post-order walk from `last_step`, collecting every
    /// step that is stale -- because a dependency changed, because its
    /// own `input_version` no longer matches the persisted one, or
    /// because it failed last time and has not changed since.
    pub fn make_update_list(&self) -> Vec<Arc<dyn Step>> {
        let mut to_update = Vec::new();
        let mut update_ids = HashSet::new();
        Self::walk(&self.last_step, &mut to_update, &mut update_ids);
        to_update
    }

    fn walk(
        step: &Arc<dyn Step>,
        to_update: &mut Vec<Arc<dyn Step>>,
        update_ids: &mut HashSet<String>,
    ) -> bool {
        let mut any_deps_changed = false;
        for dep in step.dependencies() {
            let dep_changed = Self::walk(&dep, to_update, update_ids);
            any_deps_changed = any_deps_changed || dep_changed;
        }

        let id = step.step_id();
        let is_stale = any_deps_changed
            || step.input_version() != step.state().last_time_input_version()
            || step.state().did_fail_last_time();

        if is_stale && !update_ids.contains(&id) {
            to_update.push(Arc::clone(step));
            update_ids.insert(id);
            return true;
        }
        false
    }

    /// Phase 2, one step: replay a cached failure verbatim without
    /// re-running, or bump the version, reset the error flag, run, and
    /// capture any failure.
    async fn run_step(&self, step: &Arc<dyn Step>) -> Result<(), BuildError> {
        print_header(&step.name());

        if step.state().did_fail_last_time() {
            let message = step.state().last_time_fail_message();
            println!("{message}");
            return Err(BuildError::StepFailed {
                step_id: step.step_id(),
                message,
            });
        }

        step.state().bump_version(&step.input_version())?;
        step.state().reset_error()?;

        if let Err(err) = step.run().await {
            step.state().print(&err.to_string());
            step.state().fail()?;
        }

        if step.state().has_failed_this_run() {
            return Err(BuildError::StepFailed {
                step_id: step.step_id(),
                message: step.state().last_time_fail_message(),
            });
        }

        Ok(())
    }
}

/// Entry point: build `terminal_step` and everything it transitively
/// depends on that is stale.
pub async fn build(terminal_step: Arc<dyn Step>) -> Result<(), BuildError> {
    BuildManager::new(terminal_step).build().await
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
