// src/runtime/mod.rs

//! Interpreter discovery.
//!
//! - [`version`] normalizes `major.minor` constraints.
//! - [`probe`] validates a candidate by running it.
//! - [`resolver`] walks the layered search strategies and caches results.

pub mod probe;
pub mod resolver;
pub mod version;

pub use probe::{CommandProbe, RuntimeProbe};
pub use resolver::{ResolverOptions, RuntimeHandle, RuntimeResolver};
pub use version::normalize_version;
