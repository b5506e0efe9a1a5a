//! Stage and run counters, reported as trace events.
//!
//! Nothing is recorded without the `tracing` feature. Subscribers are installed
//! by the embedding application.

use gatherflow_core::manifest::StageReport;

/// Counters recorded for one finished stage.
pub fn stage_counters(report: &StageReport) -> [(&'static str, u64); 4] {
    [
        ("partitions", report.partitions as u64),
        ("integrated", report.integrated),
        ("emitted", report.emitted),
        ("late_pushes", report.late_pushes),
    ]
}

/// Counters recorded for a finished run.
pub fn run_counters(stages: &[StageReport], delivered: u64) -> [(&'static str, u64); 3] {
    let short_circuited = stages.iter().filter(|s| s.short_circuited).count();
    [
        ("stages", stages.len() as u64),
        ("short_circuited", short_circuited as u64),
        ("delivered", delivered),
    ]
}

#[cfg(feature = "tracing")]
pub fn record_stage(report: &StageReport) {
    let span = tracing::trace_span!(
        "gatherflow.stage",
        stage = %report.stage,
        operator = %report.name,
        short_circuited = report.short_circuited
    );
    let _entered = span.enter();
    for (counter, value) in stage_counters(report) {
        tracing::trace!(counter, value, "metric");
    }
}

#[cfg(feature = "tracing")]
pub fn record_run(stages: &[StageReport], delivered: u64) {
    let span = tracing::trace_span!("gatherflow.run");
    let _entered = span.enter();
    for (counter, value) in run_counters(stages, delivered) {
        tracing::trace!(counter, value, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn record_stage(_report: &StageReport) {}

#[cfg(not(feature = "tracing"))]
pub fn record_run(_stages: &[StageReport], _delivered: u64) {}
