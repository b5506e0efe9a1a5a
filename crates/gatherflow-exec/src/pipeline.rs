//! Pipelines: an explicit, immutable list of gatherer stages.
//!
//! A `Pipeline` only describes the stages. Each run builds fresh stage runners
//! (and with them fresh state cells), so the same pipeline can be run any
//! number of times and clones share nothing mutable.

use std::marker::PhantomData;
use std::sync::Arc;

use gatherflow_core::capability::Capabilities;
use gatherflow_core::id::StageId;
use gatherflow_core::manifest::StageReport;
use gatherflow_operators::Gatherer;
use serde::{Deserialize, Serialize};

use crate::runtime::ExecError;
use crate::stage::{run_partitioned_stage, GatherStage, StageContext, StageSink};

/// Static description of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInfo {
    pub id: StageId,
    pub name: String,
    pub capabilities: Capabilities,
}

/// Type-erased stage chain from `In` to `Out`.
pub(crate) trait Chain<In, Out>: Send + Sync {
    /// Wrap `tail` with every stage of this chain, producing the head link.
    fn fuse<'a>(
        &'a self,
        tail: Box<dyn StageSink<Out> + 'a>,
        strict: bool,
    ) -> Box<dyn StageSink<In> + 'a>;

    /// Run every stage stage-at-a-time over partitioned input.
    fn run_partitioned(
        &self,
        input: Vec<Vec<In>>,
        ctx: &StageContext<'_>,
        reports: &mut Vec<StageReport>,
    ) -> Result<Vec<Vec<Out>>, ExecError>;
}

struct Identity<T>(PhantomData<fn() -> T>);

impl<T: 'static> Chain<T, T> for Identity<T> {
    fn fuse<'a>(
        &'a self,
        tail: Box<dyn StageSink<T> + 'a>,
        _strict: bool,
    ) -> Box<dyn StageSink<T> + 'a> {
        tail
    }

    fn run_partitioned(
        &self,
        input: Vec<Vec<T>>,
        _ctx: &StageContext<'_>,
        _reports: &mut Vec<StageReport>,
    ) -> Result<Vec<Vec<T>>, ExecError> {
        Ok(input)
    }
}

struct Then<In, Mid, S, Out> {
    head: Arc<dyn Chain<In, Mid>>,
    stage: StageId,
    gatherer: Gatherer<Mid, S, Out>,
}

impl<In, Mid, S, Out> Chain<In, Out> for Then<In, Mid, S, Out>
where
    In: Send + 'static,
    Mid: Send + 'static,
    S: Send + 'static,
    Out: Send + 'static,
{
    fn fuse<'a>(
        &'a self,
        tail: Box<dyn StageSink<Out> + 'a>,
        strict: bool,
    ) -> Box<dyn StageSink<In> + 'a> {
        let link = GatherStage::new(&self.gatherer, self.stage, tail, strict);
        self.head.fuse(Box::new(link), strict)
    }

    fn run_partitioned(
        &self,
        input: Vec<Vec<In>>,
        ctx: &StageContext<'_>,
        reports: &mut Vec<StageReport>,
    ) -> Result<Vec<Vec<Out>>, ExecError> {
        let mid = self.head.run_partitioned(input, ctx, reports)?;
        let (output, report) = run_partitioned_stage(&self.gatherer, self.stage, mid, ctx)?;
        reports.push(report);
        Ok(vec![output])
    }
}

/// Stage list from `In` to `Out`.
pub struct Pipeline<In, Out> {
    stages: Vec<StageInfo>,
    chain: Arc<dyn Chain<In, Out>>,
}

impl<T: Send + 'static> Pipeline<T, T> {
    /// Empty pipeline: passes elements straight to the consumer.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            chain: Arc::new(Identity(PhantomData)),
        }
    }
}

impl<T: Send + 'static> Default for Pipeline<T, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> Pipeline<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Append a stage. The receiver is left untouched.
    pub fn gather<S, R>(&self, gatherer: Gatherer<Out, S, R>) -> Pipeline<In, R>
    where
        S: Send + 'static,
        R: Send + 'static,
    {
        let id = self.stages.last().map_or(StageId::new(0), |last| last.id.next());
        let mut stages = self.stages.clone();
        stages.push(StageInfo {
            id,
            name: gatherer.name().to_string(),
            capabilities: gatherer.capabilities(),
        });
        Pipeline {
            stages,
            chain: Arc::new(Then {
                head: Arc::clone(&self.chain),
                stage: id,
                gatherer,
            }),
        }
    }
}

impl<In, Out> Pipeline<In, Out> {
    pub fn stages(&self) -> &[StageInfo] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn chain(&self) -> &dyn Chain<In, Out> {
        self.chain.as_ref()
    }
}

impl<In, Out> Clone for Pipeline<In, Out> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<In, Out> std::fmt::Debug for Pipeline<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish()
    }
}
