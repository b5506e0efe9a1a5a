//! Runtime: drive a `Pipeline` over a `Source` into a consumer and emit a
//! `RunManifest`.
//!
//! INIT plans partition counts (and rejects impossible forced parallelism
//! before any element is pulled). When every stage ends up on one partition
//! the run is fused and lazy; otherwise it goes stage-at-a-time over
//! partitions.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use gatherflow_core::config::EngineConfig;
use gatherflow_core::hash::{hash_serde, Hash256};
use gatherflow_core::id::{PartitionId, StageId};
use gatherflow_core::manifest::{RunManifest, StageReport};
use gatherflow_operators::{Collect, Downstream, OpError, Take};

use crate::metrics::record_run;
use crate::pipeline::Pipeline;
use crate::scheduler::{plan_partitions, PartitionPlan};
use crate::source::Source;
use crate::stage::{StageContext, StageSink, TerminalSink};

#[derive(Debug, Error)]
pub enum ExecError {
    /// The run cannot be set up as requested; nothing was processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("contract violation in {stage}: {detail}")]
    ContractViolation { stage: StageId, detail: String },

    #[error("user function failed in {stage}: {source}")]
    UserFunction {
        stage: StageId,
        #[source]
        source: OpError,
    },

    #[error("{partition} of {stage} panicked")]
    Panicked {
        stage: StageId,
        partition: PartitionId,
    },

    #[error(transparent)]
    Core(#[from] gatherflow_core::Error),
}

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Merging,
    Finishing,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Running => "running",
            Phase::Merging => "merging",
            Phase::Finishing => "finishing",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "tracing")]
pub(crate) fn enter_phase(phase: Phase, stage: Option<StageId>) {
    match stage {
        Some(stage) => tracing::debug!(phase = phase.as_str(), stage = %stage, "phase"),
        None => tracing::debug!(phase = phase.as_str(), "phase"),
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn enter_phase(_phase: Phase, _stage: Option<StageId>) {}

/// Engine owns the validated configuration; every run gets fresh stage state.
#[derive(Debug, Clone)]
pub struct Engine {
    cfg: EngineConfig,
    config_hash: Hash256,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate()
            .map_err(|e| ExecError::Configuration(e.to_string()))?;
        let config_hash = hash_serde(&cfg)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(config = %config_hash.short(), parallelism = ?cfg.parallelism, "engine ready");
        Ok(Self { cfg, config_hash })
    }

    pub fn from_env() -> Result<Self, ExecError> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn config_hash(&self) -> Hash256 {
        self.config_hash
    }

    /// Run `pipeline` over `source`, pushing results into `consumer` until it
    /// refuses.
    pub fn run<In, Out, Src>(
        &self,
        pipeline: &Pipeline<In, Out>,
        source: Src,
        consumer: &mut dyn Downstream<Out>,
    ) -> Result<RunManifest, ExecError>
    where
        In: Send + 'static,
        Out: Send + 'static,
        Src: Source<In>,
    {
        let manifest = RunManifest::new(self.config_hash, now_millis());

        enter_phase(Phase::Init, None);
        let plan = plan_partitions(
            self.cfg.parallelism,
            pipeline.stages(),
            source.is_splittable(),
        )?;

        let (stages, delivered) = if plan.is_sequential() {
            self.run_fused(pipeline, source, consumer)?
        } else {
            self.run_staged(pipeline, source, consumer, &plan)?
        };

        enter_phase(Phase::Done, None);
        record_run(&stages, delivered);
        Ok(manifest.finish(now_millis(), stages, delivered))
    }

    fn run_fused<In, Out, Src>(
        &self,
        pipeline: &Pipeline<In, Out>,
        source: Src,
        consumer: &mut dyn Downstream<Out>,
    ) -> Result<(Vec<StageReport>, u64), ExecError>
    where
        In: Send + 'static,
        Out: Send + 'static,
        Src: Source<In>,
    {
        let mut head = pipeline.chain().fuse(
            Box::new(TerminalSink::new(consumer)),
            self.cfg.strict_contracts,
        );

        enter_phase(Phase::Running, None);
        let mut elements = source.into_elements();
        // Check before pulling so an infinite source is never asked for an
        // element nobody will integrate.
        while !head.is_rejecting() {
            let Some(element) = elements.next() else {
                break;
            };
            if !head.push(element) {
                break;
            }
        }
        if let Some(err) = head.take_error() {
            return Err(err);
        }

        enter_phase(Phase::Finishing, None);
        head.finish()?;
        if let Some(err) = head.take_error() {
            return Err(err);
        }

        let mut reports = Vec::with_capacity(pipeline.len());
        head.reports(&mut reports);
        Ok((reports, head.delivered()))
    }

    fn run_staged<In, Out, Src>(
        &self,
        pipeline: &Pipeline<In, Out>,
        source: Src,
        consumer: &mut dyn Downstream<Out>,
        plan: &PartitionPlan,
    ) -> Result<(Vec<StageReport>, u64), ExecError>
    where
        In: Send + 'static,
        Out: Send + 'static,
        Src: Source<In>,
    {
        let input = source.split(plan.for_stage(StageId::new(0)));
        let ctx = StageContext {
            plan,
            cfg: &self.cfg,
        };

        let mut reports = Vec::with_capacity(pipeline.len());
        let output = pipeline.chain().run_partitioned(input, &ctx, &mut reports)?;

        let mut terminal = TerminalSink::new(consumer);
        for element in output.into_iter().flatten() {
            if terminal.is_rejecting() || !terminal.push(element) {
                break;
            }
        }
        Ok((reports, terminal.delivered()))
    }

    /// Run and collect every result.
    pub fn collect<In, Out, Src>(
        &self,
        pipeline: &Pipeline<In, Out>,
        source: Src,
    ) -> Result<Vec<Out>, ExecError>
    where
        In: Send + 'static,
        Out: Send + 'static,
        Src: Source<In>,
    {
        let mut sink = Collect::new();
        self.run(pipeline, source, &mut sink)?;
        Ok(sink.into_vec())
    }

    /// Run until the first result arrives.
    pub fn find_first<In, Out, Src>(
        &self,
        pipeline: &Pipeline<In, Out>,
        source: Src,
    ) -> Result<Option<Out>, ExecError>
    where
        In: Send + 'static,
        Out: Send + 'static,
        Src: Source<In>,
    {
        let mut sink = Take::first();
        self.run(pipeline, source, &mut sink)?;
        Ok(sink.into_first())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatherflow_core::config::Parallelism;
    use gatherflow_operators::{limit, map};

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EngineConfig {
            min_partition_len: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(cfg), Err(ExecError::Configuration(_))));
    }

    #[test]
    fn test_manifest_carries_config_hash() {
        let engine = Engine::new(EngineConfig::sequential()).unwrap();
        let p = Pipeline::<i32, i32>::new().gather(map(|x: i32| x * 3));
        let mut out = Collect::new();
        let manifest = engine.run(&p, vec![1, 2, 3], &mut out).unwrap();
        assert_eq!(out.items(), &[3, 6, 9]);
        assert_eq!(manifest.config_hash, engine.config_hash());
        assert_eq!(manifest.delivered, 3);
        assert_eq!(manifest.stages.len(), 1);
        assert!(manifest.finished_ms >= manifest.started_ms);
    }

    #[test]
    fn test_staged_run_reports_partitions() {
        let engine =
            Engine::new(EngineConfig::default().with_parallelism(Parallelism::Exact(2))).unwrap();
        let p = Pipeline::<i32, i32>::new().gather(map(|x: i32| x + 1));
        let mut out = Collect::new();
        let manifest = engine.run(&p, (0..6).collect::<Vec<i32>>(), &mut out).unwrap();
        assert_eq!(out.into_vec(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(manifest.stages[0].partitions, 2);
        assert_eq!(manifest.stages[0].integrated, 6);
    }

    #[test]
    fn test_find_first_stops_early() {
        let engine = Engine::new(EngineConfig::sequential()).unwrap();
        let p = Pipeline::<i32, i32>::new().gather(limit(5));
        assert_eq!(engine.find_first(&p, vec![7, 8, 9]).unwrap(), Some(7));
        assert_eq!(Phase::Merging.to_string(), "merging");
    }
}
