#![forbid(unsafe_code)]
//! gatherflow: user-defined intermediate operators ("gatherers") over
//! sequential and parallel one-pass pipelines.
//!
//! This crate only re-exports the workspace members:
//! - `core`: ids, capability flags, config, hashing, run manifests;
//! - `operators`: the `Gatherer` contract, terminal sinks, reference operators;
//! - `exec`: sources, pipelines and the `Engine` driver.

pub use gatherflow_core as core;
pub use gatherflow_exec as exec;
pub use gatherflow_operators as operators;

pub mod prelude {
    pub use gatherflow_core::prelude::*;
    pub use gatherflow_exec::{Engine, ExecError, IterSource, Phase, Pipeline, Source, StageInfo, VecSource};
    pub use gatherflow_operators::{
        dedup_consecutive, filter, find_index, find_indexes, flat_map, fold, fold_parallel, limit,
        map, map_concurrent, map_sequential, scan, window_fixed, window_sliding, Collect,
        Downstream, FnSink, Gatherer, Integrator, OpError, Take,
    };
}
