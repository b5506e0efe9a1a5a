//! Per-run stage execution: the state cells live here, never in the pipeline.
//!
//! Two runners share one sink discipline (`Guarded`): a push made after the
//! downstream refused is dropped and counted instead of forwarded.
//!
//! - `GatherStage` is one link of the fused chain; it owns a single state cell
//!   for the whole run and pushes straight into the next link.
//! - `run_partitioned_stage` runs one stage over several partitions, each with
//!   its own state cell and output buffer, then merges and finishes.

use gatherflow_core::config::EngineConfig;
use gatherflow_core::id::{PartitionId, StageId};
use gatherflow_core::manifest::StageReport;
use gatherflow_operators::{Downstream, Gatherer, OpError};

use crate::metrics::record_stage;
use crate::runtime::{enter_phase, ExecError, Phase};
use crate::scheduler::{repartition, PartitionPlan};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SinkCounters {
    pub refused: bool,
    pub emitted: u64,
    pub late: u64,
}

/// Downstream wrapper handed to integrators and finishers.
pub(crate) struct Guarded<'d, D: ?Sized> {
    inner: &'d mut D,
    counters: &'d mut SinkCounters,
}

impl<'d, D: ?Sized> Guarded<'d, D> {
    pub fn new(inner: &'d mut D, counters: &'d mut SinkCounters) -> Self {
        Self { inner, counters }
    }
}

impl<T, D: Downstream<T> + ?Sized> Downstream<T> for Guarded<'_, D> {
    fn push(&mut self, value: T) -> bool {
        if self.counters.refused {
            self.counters.late += 1;
            return false;
        }
        self.counters.emitted += 1;
        if !self.inner.push(value) {
            self.counters.refused = true;
        }
        !self.counters.refused
    }

    fn is_rejecting(&self) -> bool {
        self.counters.refused || self.inner.is_rejecting()
    }
}

/// One link of a fused chain.
pub(crate) trait StageSink<T>: Downstream<T> {
    /// Run this stage's finisher, then finish everything downstream of it.
    fn finish(&mut self) -> Result<(), ExecError>;

    /// First failure recorded while pushing, here or further down.
    fn take_error(&mut self) -> Option<ExecError>;

    fn reports(&self, out: &mut Vec<StageReport>);

    /// Elements accepted by the terminal consumer so far.
    fn delivered(&self) -> u64;
}

/// End of the chain: forwards into the caller's consumer and counts.
pub(crate) struct TerminalSink<'t, T> {
    inner: &'t mut dyn Downstream<T>,
    delivered: u64,
}

impl<'t, T> TerminalSink<'t, T> {
    pub fn new(inner: &'t mut dyn Downstream<T>) -> Self {
        Self {
            inner,
            delivered: 0,
        }
    }
}

impl<T> Downstream<T> for TerminalSink<'_, T> {
    fn push(&mut self, value: T) -> bool {
        self.delivered += 1;
        self.inner.push(value)
    }

    fn is_rejecting(&self) -> bool {
        self.inner.is_rejecting()
    }
}

impl<T> StageSink<T> for TerminalSink<'_, T> {
    fn finish(&mut self) -> Result<(), ExecError> {
        Ok(())
    }

    fn take_error(&mut self) -> Option<ExecError> {
        None
    }

    fn reports(&self, _out: &mut Vec<StageReport>) {}

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

pub(crate) struct GatherStage<'a, In, S, Out> {
    gatherer: &'a Gatherer<In, S, Out>,
    /// `None` once finished.
    state: Option<S>,
    downstream: Box<dyn StageSink<Out> + 'a>,
    counters: SinkCounters,
    stopped: bool,
    error: Option<ExecError>,
    report: StageReport,
    strict: bool,
}

impl<'a, In, S, Out> GatherStage<'a, In, S, Out> {
    pub fn new(
        gatherer: &'a Gatherer<In, S, Out>,
        stage: StageId,
        downstream: Box<dyn StageSink<Out> + 'a>,
        strict: bool,
    ) -> Self {
        let mut report = StageReport::new(stage, gatherer.name(), gatherer.capabilities());
        report.partitions = 1;
        Self {
            gatherer,
            state: Some(gatherer.initialize()),
            downstream,
            counters: SinkCounters::default(),
            stopped: false,
            error: None,
            report,
            strict,
        }
    }

    /// The stage report with the sink counters folded in.
    fn snapshot(&self) -> StageReport {
        let mut report = self.report.clone();
        report.emitted = self.counters.emitted;
        report.late_pushes = self.counters.late;
        report
    }
}

impl<In, S, Out> Downstream<In> for GatherStage<'_, In, S, Out> {
    fn push(&mut self, element: In) -> bool {
        if self.stopped {
            return false;
        }
        if self.counters.refused || self.downstream.is_rejecting() {
            // Nothing further down wants output; stop without integrating.
            self.stopped = true;
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };

        self.report.integrated += 1;
        let mut guard = Guarded::new(self.downstream.as_mut(), &mut self.counters);
        match self.gatherer.integrate(state, element, &mut guard) {
            Ok(true) => true,
            Ok(false) => {
                self.stopped = true;
                self.report.short_circuited = true;
                #[cfg(feature = "tracing")]
                tracing::debug!(stage = %self.report.stage, after = self.report.integrated, "stage short-circuited");
                false
            }
            Err(source) => {
                self.stopped = true;
                self.error = Some(ExecError::UserFunction {
                    stage: self.report.stage,
                    source,
                });
                false
            }
        }
    }

    fn is_rejecting(&self) -> bool {
        self.stopped || self.counters.refused || self.downstream.is_rejecting()
    }
}

impl<In, S, Out> StageSink<In> for GatherStage<'_, In, S, Out> {
    fn finish(&mut self) -> Result<(), ExecError> {
        let stage = self.report.stage;
        if let Some(state) = self.state.take() {
            let mut guard = Guarded::new(self.downstream.as_mut(), &mut self.counters);
            self.gatherer
                .finish(state, &mut guard)
                .map_err(|source| ExecError::UserFunction { stage, source })?;
        }
        if self.counters.late > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(stage = %stage, late = self.counters.late, "pushes after downstream refused");
            if self.strict {
                return Err(ExecError::ContractViolation {
                    stage,
                    detail: format!("{} push(es) after downstream refused", self.counters.late),
                });
            }
        }
        record_stage(&self.snapshot());
        self.downstream.finish()
    }

    fn take_error(&mut self) -> Option<ExecError> {
        self.error.take().or_else(|| self.downstream.take_error())
    }

    fn reports(&self, out: &mut Vec<StageReport>) {
        out.push(self.snapshot());
        self.downstream.reports(out);
    }

    fn delivered(&self) -> u64 {
        self.downstream.delivered()
    }
}

/// Shared inputs of the staged path.
pub(crate) struct StageContext<'c> {
    pub plan: &'c PartitionPlan,
    pub cfg: &'c EngineConfig,
}

struct PartitionRun<S, Out> {
    state: S,
    output: Vec<Out>,
    counters: SinkCounters,
    integrated: u64,
    stopped: bool,
    error: Option<OpError>,
}

/// RUNNING for one partition: fresh state, feed in order until exhausted or refused.
fn run_partition<In, S, Out>(gatherer: &Gatherer<In, S, Out>, chunk: Vec<In>) -> PartitionRun<S, Out> {
    let mut state = gatherer.initialize();
    let mut output = Vec::new();
    let mut counters = SinkCounters::default();
    let mut integrated = 0;
    let mut stopped = false;
    let mut error = None;

    for element in chunk {
        integrated += 1;
        let mut guard = Guarded::new(&mut output, &mut counters);
        match gatherer.integrate(&mut state, element, &mut guard) {
            Ok(true) => {}
            Ok(false) => {
                stopped = true;
                break;
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    PartitionRun {
        state,
        output,
        counters,
        integrated,
        stopped,
        error,
    }
}

/// Run one stage over partitioned input: RUNNING, MERGING, FINISHING.
///
/// Returns the stage's complete output in input order.
pub(crate) fn run_partitioned_stage<In, S, Out>(
    gatherer: &Gatherer<In, S, Out>,
    stage: StageId,
    input: Vec<Vec<In>>,
    ctx: &StageContext<'_>,
) -> Result<(Vec<Out>, StageReport), ExecError>
where
    In: Send,
    S: Send,
    Out: Send,
{
    let len: usize = input.iter().map(Vec::len).sum();
    let p = ctx.plan.effective(stage, len, ctx.cfg.min_partition_len);
    let parts = repartition(input, p);

    let mut report = StageReport::new(stage, gatherer.name(), gatherer.capabilities());
    report.partitions = parts.len();

    enter_phase(Phase::Running, Some(stage));
    let runs: Vec<PartitionRun<S, Out>> = if parts.len() == 1 {
        parts
            .into_iter()
            .map(|chunk| run_partition(gatherer, chunk))
            .collect()
    } else {
        let joined = std::thread::scope(|scope| {
            let handles: Vec<_> = parts
                .into_iter()
                .map(|chunk| scope.spawn(move || run_partition(gatherer, chunk)))
                .collect();
            // Join every handle before looking at results so no panic is left unjoined.
            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| {
                    handle.join().map_err(|_| ExecError::Panicked {
                        stage,
                        partition: PartitionId::new(i),
                    })
                })
                .collect::<Vec<_>>()
        });
        joined.into_iter().collect::<Result<Vec<_>, _>>()?
    };

    if runs.len() > 1 {
        enter_phase(Phase::Merging, Some(stage));
    }
    let mut merged: Option<(S, Vec<Out>)> = None;
    for run in runs {
        report.integrated += run.integrated;
        report.short_circuited |= run.stopped;
        report.late_pushes += run.counters.late;
        if let Some(source) = run.error {
            return Err(ExecError::UserFunction { stage, source });
        }
        merged = Some(match merged.take() {
            None => (run.state, run.output),
            Some((left, mut output)) => {
                let state = gatherer
                    .combine(left, run.state)
                    .map_err(|source| ExecError::UserFunction { stage, source })?;
                output.extend(run.output);
                (state, output)
            }
        });
    }
    let (state, mut output) = merged.ok_or_else(|| {
        ExecError::Core(gatherflow_core::Error::Invariant(format!(
            "{stage} ran without partitions"
        )))
    })?;

    enter_phase(Phase::Finishing, Some(stage));
    let mut counters = SinkCounters::default();
    let mut guard = Guarded::new(&mut output, &mut counters);
    gatherer
        .finish(state, &mut guard)
        .map_err(|source| ExecError::UserFunction { stage, source })?;

    report.emitted = output.len() as u64;
    record_stage(&report);
    Ok((output, report))
}
