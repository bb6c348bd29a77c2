// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Step graph engine: the `Step` trait, identity-based deduplication
//! via `StepRegistry`, the two-phase incremental build algorithm, and the
//! `ExecStep` subprocess adapter.

pub mod build;
pub mod error;
pub mod exec_step;
pub mod registry;
pub mod step;

pub use build::{build, BuildManager};
pub use error::{BuildError, StepRunError};
pub use exec_step::{ArgFormat, ExecArgument, ExecStep};
pub use registry::StepRegistry;
pub use step::{Step, StepState, INPUT_VERSION_NOT_EXISTENT};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
