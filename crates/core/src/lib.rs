// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Leaf utilities shared across the `kiln` workspace: the excluded-zone
//! source scanner, the filesystem abstraction, and project configuration
//! loading.

pub mod config;
pub mod filesystem;
pub mod scan;

pub use config::{load_project_config, ProjectConfig};
pub use filesystem::Filesystem;
pub use scan::{ExcludedZoneSpec, ScanError, ScanMatch};
