#![forbid(unsafe_code)]
//! gatherflow-exec: sources, pipeline stage lists and the driver.
//!
//! The `Engine` runs a `Pipeline` of gatherers over a `Source` in one of two
//! shapes, chosen at INIT from the configured parallelism and the stages'
//! capability flags:
//! - fused: every stage on one partition, elements pushed through the whole
//!   chain one at a time (lazy, works with infinite sources);
//! - staged: stage-at-a-time over partitions on scoped threads, states merged
//!   left-to-right with the combiner, partition buffers concatenated in order.

pub mod metrics;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod source;
mod stage;

pub use pipeline::{Pipeline, StageInfo};
pub use runtime::{Engine, ExecError, Phase};
pub use source::{IterSource, Source, VecSource};
