//! Convenient re-exports for downstream crates.

pub use crate::capability::{Capabilities, Characteristic};
pub use crate::config::{EngineConfig, Parallelism};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{PartitionId, StageId};
pub use crate::manifest::{ManifestId, RunManifest, StageReport};
