#![forbid(unsafe_code)]
//! gatherflow-core: shared vocabulary for the gatherflow workspace.
//!
//! Holds the pieces every other crate agrees on: strongly-typed ids, the
//! capability flags derived from an operator's shape, engine configuration,
//! the core error type, stable hashing and the run manifest.
//!
//! No threads, runtimes or user-function execution live here.

pub mod capability;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;

pub use capability::{Capabilities, Characteristic};
pub use config::{EngineConfig, Parallelism};
pub use error::{Error, Result};

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
