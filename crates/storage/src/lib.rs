// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Persistent Namespace Store: a flat key-value store with a
//! hierarchical, escape-encoded key namespace, backing all cross-run
//! memoisation in `kiln`.

mod namespace;
mod store;

pub use namespace::Namespace;
pub use store::{JsonFileStore, Store, StoreError};
