//! A scriptable [`Step`] for exercising [`crate::build::BuildManager`]
//! without spawning real subprocesses or touching real files. Shared
//! between this crate's own unit tests and `kiln-specs`'s integration
//! tests via the `test-support` feature.

use crate::error::StepRunError;
use crate::step::{Step, StepState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct ScriptedStepHandle {
    version: Arc<parking_lot::Mutex<String>>,
    run_count: Arc<AtomicUsize>,
    should_fail: Arc<parking_lot::Mutex<bool>>,
}

impl ScriptedStepHandle {
    pub fn set_version(&self, version: impl Into<String>) {
        *self.version.lock() = version.into();
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock() = should_fail;
    }

    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

/// A `Step` whose `input_version` and failure behavior are controlled
/// through a [`ScriptedStepHandle`] held by the test, independent of the
/// `Arc<dyn Step>` handed to a `StepRegistry`/`BuildManager`.
pub struct ScriptedStep {
    state: StepState,
    id: String,
    version: Arc<parking_lot::Mutex<String>>,
    run_count: Arc<AtomicUsize>,
    should_fail: Arc<parking_lot::Mutex<bool>>,
}

/// Build a scripted step and the handle used to steer it from a test.
pub fn scripted_step(
    id: impl Into<String>,
    dependencies: Vec<Arc<dyn Step>>,
) -> (ScriptedStep, ScriptedStepHandle) {
    let version = Arc::new(parking_lot::Mutex::new("1".to_string()));
    let run_count = Arc::new(AtomicUsize::new(0));
    let should_fail = Arc::new(parking_lot::Mutex::new(false));

    let step = ScriptedStep {
        state: StepState::with_dependencies(dependencies),
        id: id.into(),
        version: Arc::clone(&version),
        run_count: Arc::clone(&run_count),
        should_fail: Arc::clone(&should_fail),
    };
    let handle = ScriptedStepHandle {
        version,
        run_count,
        should_fail,
    };
    (step, handle)
}

#[async_trait]
impl Step for ScriptedStep {
    fn state(&self) -> &StepState {
        &self.state
    }

    fn step_id(&self) -> String {
        self.id.clone()
    }

    fn input_version(&self) -> String {
        self.version.lock().clone()
    }

    async fn run(&self) -> Result<(), StepRunError> {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        if *self.should_fail.lock() {
            return Err(StepRunError::Failed("boom".to_string()));
        }
        Ok(())
    }
}
