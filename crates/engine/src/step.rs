//! The `Step` abstraction: an interface every build-graph node implements,
//! plus the bookkeeping (dependencies, persistent namespace, transient
//! output buffer) common to every variant.
//!
//! Grounded on `original_source/pysbs/core/step.py::BuildStep`: the same
//! split between user-defined surface (`step_id`, `input_version`, `run`)
//! and internal bookkeeping (`name`/`_name_hook`, `ns`, `print`, `fail`,
//! `_bump_version`, `_reset_error`), translated from a metaclass-backed
//! singleton-by-id into the explicit `StepRegistry::intern` factory
//! `spec.md` §9 prescribes.

use crate::error::StepRunError;
use crate::registry::StepRegistry;
use async_trait::async_trait;
use kiln_storage::Namespace;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

/// Version reported for a step that has never been persisted before.
pub const INPUT_VERSION_NOT_EXISTENT: &str = "";

type NameHook = Box<dyn Fn(&str) + Send + Sync>;

/// Bookkeeping shared by every [`Step`] implementation: the mutable
/// dependency list, the persistent namespace (bound once, at intern
/// time), the transient captured-output buffer, and the mutable,
/// hook-observable `name`.
pub struct StepState {
    dependencies: Mutex<Vec<Arc<dyn Step>>>,
    ns: OnceLock<Namespace>,
    name: Mutex<String>,
    name_hook: Mutex<Option<NameHook>>,
    captured_output: Mutex<String>,
    failed: Mutex<bool>,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            dependencies: Mutex::new(Vec::new()),
            ns: OnceLock::new(),
            name: Mutex::new(String::new()),
            name_hook: Mutex::new(None),
            captured_output: Mutex::new(String::new()),
            failed: Mutex::new(false),
        }
    }
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependencies(dependencies: Vec<Arc<dyn Step>>) -> Self {
        Self {
            dependencies: Mutex::new(dependencies),
            ..Self::default()
        }
    }

    /// Bound once by [`StepRegistry::intern`], immediately after a
    /// freshly-constructed step wins the dedup check.
    pub(crate) fn bind_namespace(&self, ns: Namespace) {
        let _ = self.ns.set(ns);
    }

    /// The namespace this step persists state under, or `None` if this
    /// step has not yet been bound by [`StepRegistry::intern`]. Every step
    /// reachable through the registry has one; a step constructed but
    /// never interned does not.
    pub fn ns(&self) -> Option<&Namespace> {
        self.ns.get()
    }

    /// Read a persisted value, falling back to `default` if the
    /// namespace is unbound or the key is absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.ns().and_then(|ns| ns.get(key)).unwrap_or(default)
    }

    /// Write a persisted value. Fails with
    /// [`StepRunError::NamespaceUnbound`] if this step has not been
    /// interned yet.
    pub fn set_persisted<T: Serialize>(&self, key: &str, value: T) -> Result<(), StepRunError> {
        let ns = self.ns().ok_or(StepRunError::NamespaceUnbound)?;
        ns.set(key, value)?;
        Ok(())
    }

    pub fn dependencies(&self) -> Vec<Arc<dyn Step>> {
        self.dependencies.lock().clone()
    }

    pub fn add_dependency(&self, dep: Arc<dyn Step>) {
        self.dependencies.lock().push(dep);
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Set this step's human-readable name, invoking the subscribed hook
    /// (if any) with the new value.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        *self.name.lock() = name.clone();
        if let Some(hook) = self.name_hook.lock().as_ref() {
            hook(&name);
        }
    }

    pub fn set_name_hook(&self, hook: Option<NameHook>) {
        *self.name_hook.lock() = hook;
    }

    /// Print to stdout, capturing the same text so it can be replayed
    /// verbatim on a future run that reuses this step's cached failure.
    pub fn print(&self, message: &str) {
        println!("{message}");
        let mut captured = self.captured_output.lock();
        captured.push_str(message);
        captured.push('\n');
    }

    /// Persist this run's captured output as the step's failure message
    /// and mark it failed, both for this run and for the next one.
    pub fn fail(&self) -> Result<(), StepRunError> {
        let output = self.captured_output.lock().clone();
        self.set_persisted("has_failed", true)?;
        self.set_persisted("fail_message", output)?;
        *self.failed.lock() = true;
        Ok(())
    }

    /// Whether `fail()` was called during the run currently in progress.
    pub fn has_failed_this_run(&self) -> bool {
        *self.failed.lock()
    }

    pub fn last_time_input_version(&self) -> String {
        self.get_or("last_time_input_version", INPUT_VERSION_NOT_EXISTENT.to_string())
    }

    pub fn did_fail_last_time(&self) -> bool {
        self.get_or("has_failed", false)
    }

    pub fn last_time_fail_message(&self) -> String {
        self.get_or("fail_message", String::new())
    }

    /// Persist `input_version` as `last_time_input_version`, run before
    /// `run()` so a step that completes successfully will not be re-run
    /// next time if nothing else changed.
    pub(crate) fn bump_version(&self, input_version: &str) -> Result<(), StepRunError> {
        self.set_persisted("last_time_input_version", input_version)
    }

    /// Clear the persisted and transient failure flags, giving a step
    /// about to run idempotent failure semantics.
    pub(crate) fn reset_error(&self) -> Result<(), StepRunError> {
        self.set_persisted("has_failed", false)?;
        self.set_persisted("fail_message", "")?;
        *self.failed.lock() = false;
        Ok(())
    }
}

/// A node in the build DAG: stable identity, a versioned snapshot of its
/// live inputs, and an idempotent action.
///
/// Implementers embed a [`StepState`] and expose it via [`Step::state`];
/// the engine and [`StepRegistry`] speak only to this trait, never to a
/// concrete step type.
#[async_trait]
pub trait Step: Send + Sync {
    /// This step's shared bookkeeping.
    fn state(&self) -> &StepState;

    /// A stable string uniquely identifying this step across runs.
    /// Identity is by value: two steps with equal `step_id` are the same
    /// step, per [`StepRegistry::intern`].
    fn step_id(&self) -> String;

    /// A snapshot token of this step's live inputs, freshly computed on
    /// every call. Equality with the persisted `last_time_input_version`
    /// implies the inputs have not changed.
    fn input_version(&self) -> String;

    /// Run this step: compile, link, generate, or otherwise act.
    /// The default does nothing, matching a build-graph node that exists
    /// purely to express dependency structure (e.g. [`crate::exec_step`]'s
    /// sibling in `kiln-adapters`, `CDependencyStep`).
    async fn run(&self) -> Result<(), StepRunError> {
        Ok(())
    }

    /// Called once, immediately after this step wins `StepRegistry`'s
    /// dedup check and has its namespace bound. Default is a no-op;
    /// overridden by steps that need to discover and append their own
    /// dependencies at construction time (e.g. `CDependencyStep` resolving
    /// `#include`s).
    fn post_init(&self, _registry: &StepRegistry) {}

    fn dependencies(&self) -> Vec<Arc<dyn Step>> {
        self.state().dependencies()
    }

    fn name(&self) -> String {
        self.state().name()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
