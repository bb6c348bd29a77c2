//! Error types for the build graph engine.

use kiln_storage::StoreError;
use thiserror::Error;

/// An error surfaced from a [`crate::Step::run`] implementation. Captured,
/// formatted, and persisted by the engine rather than propagated raw, per
/// `spec.md` §7's "`run`-level exceptions are caught, formatted ... and
/// converted into `BuildFailed`" propagation policy.
#[derive(Debug, Error)]
pub enum StepRunError {
    #[error("{0}")]
    Failed(String),
    #[error("failed to persist step state: {0}")]
    Store(#[from] StoreError),
    /// A step's persistent-state accessors were used before
    /// [`crate::registry::StepRegistry::intern`] bound its namespace.
    /// A programmer error: every step reachable through the registry is
    /// interned before the engine or its own `run()` touches this state.
    #[error("step namespace not bound (step was not interned through StepRegistry::intern)")]
    NamespaceUnbound,
}

/// The outcome of a [`crate::build::BuildManager::build`] run that could
/// not complete.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("step `{step_id}` failed:\n{message}")]
    StepFailed { step_id: String, message: String },
    #[error("failed to persist step state: {0}")]
    Persist(#[from] StepRunError),
}
