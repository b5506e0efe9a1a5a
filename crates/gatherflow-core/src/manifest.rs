//! Run manifest: what the driver did, stage by stage.
//!
//! The engine emits a manifest after every run, including runs that stopped
//! early because the terminal consumer refused more output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::Capabilities;
use crate::hash::Hash256;
use crate::id::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

/// Per-stage execution counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageId,
    pub name: String,
    pub capabilities: Capabilities,
    /// Number of partitions (independent state cells) the stage ran with.
    pub partitions: usize,
    /// Total integrator invocations across all partitions.
    pub integrated: u64,
    /// Elements pushed downstream, finisher output included.
    pub emitted: u64,
    /// True if any partition's integrator returned `false`.
    pub short_circuited: bool,
    /// Pushes made after the downstream had already refused.
    pub late_pushes: u64,
}

impl StageReport {
    pub fn new(stage: StageId, name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            stage,
            name: name.into(),
            capabilities,
            partitions: 0,
            integrated: 0,
            emitted: 0,
            short_circuited: false,
            late_pushes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the engine configuration used for the run.
    pub config_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// One report per stage, head first.
    pub stages: Vec<StageReport>,

    /// Elements accepted by the terminal consumer.
    pub delivered: u64,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(config_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            config_hash,
            engine_version: crate::VERSION.to_string(),
            stages: Vec::new(),
            delivered: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, stages: Vec<StageReport>, delivered: u64) -> Self {
        self.finished_ms = finished_ms;
        self.stages = stages;
        self.delivered = delivered;
        self
    }

    pub fn stage(&self, id: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == id)
    }
}
