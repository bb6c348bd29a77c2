// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! C/C++ build adapters on top of `kiln-engine`: project configuration,
//! `#include`-based dependency discovery, compile/link step builders, and
//! the build-script invalidator.

pub mod c_build;
pub mod cdeps;
pub mod cproject;
pub mod invalidator;

pub use c_build::{c_compile_step, c_link_step};
pub use cdeps::CDependencyStep;
pub use cproject::CProject;
pub use invalidator::{build_deptree, invalidate_if_needed, walk_deptree, DeptreeFile};
