//! Partition planning and order-preserving splitting.
//!
//! INIT decides a partition count per stage from the parallelism policy, the
//! stages' capability flags and whether the source can be split. Forced
//! parallelism that a stage or the source cannot honour fails here, before a
//! single element is pulled.

use gatherflow_core::config::Parallelism;
use gatherflow_core::id::StageId;

use crate::pipeline::StageInfo;
use crate::runtime::ExecError;

/// Partition counts decided at INIT, indexed by stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    per_stage: Vec<usize>,
    exact: bool,
}

impl PartitionPlan {
    pub fn for_stage(&self, stage: StageId) -> usize {
        self.per_stage
            .get(stage.index())
            .copied()
            .unwrap_or(1)
    }

    /// True when every stage runs on one partition (the fused path).
    pub fn is_sequential(&self) -> bool {
        self.per_stage.iter().all(|&p| p <= 1)
    }

    /// Partitions to actually use for a stage whose input has `len` elements.
    ///
    /// Auto plans never create partitions shorter than `min_len`; exact plans
    /// keep their count even if some partitions end up empty.
    pub fn effective(&self, stage: StageId, len: usize, min_len: usize) -> usize {
        let planned = self.for_stage(stage);
        if self.exact || planned <= 1 {
            return planned.max(1);
        }
        planned.min((len / min_len.max(1)).max(1))
    }
}

pub fn plan_partitions(
    parallelism: Parallelism,
    stages: &[StageInfo],
    splittable: bool,
) -> Result<PartitionPlan, ExecError> {
    let per_stage = match parallelism {
        Parallelism::Sequential => vec![1; stages.len()],
        forced if forced.is_forced() => {
            let n = forced.requested();
            if !splittable {
                return Err(ExecError::Configuration(format!(
                    "source cannot be split into {n} partitions"
                )));
            }
            if let Some(s) = stages.iter().find(|s| s.capabilities.is_sequential()) {
                return Err(ExecError::Configuration(format!(
                    "{} '{}' is SEQUENTIAL and cannot run on {n} partitions",
                    s.id, s.name
                )));
            }
            vec![n; stages.len()]
        }
        Parallelism::Exact(n) => vec![n.max(1); stages.len()],
        Parallelism::Auto(_) if !splittable => vec![1; stages.len()],
        Parallelism::Auto(n) => stages
            .iter()
            .map(|s| if s.capabilities.is_sequential() { 1 } else { n.max(1) })
            .collect(),
    };

    Ok(PartitionPlan {
        per_stage,
        exact: matches!(parallelism, Parallelism::Exact(_)),
    })
}

/// Split into `p` contiguous chunks whose lengths differ by at most one.
pub fn split_even<T>(items: Vec<T>, p: usize) -> Vec<Vec<T>> {
    let p = p.max(1);
    let base = items.len() / p;
    let extra = items.len() % p;
    let mut it = items.into_iter();
    (0..p)
        .map(|i| it.by_ref().take(base + usize::from(i < extra)).collect())
        .collect()
}

/// Regroup already-partitioned data into `p` partitions, keeping order.
pub fn repartition<T>(parts: Vec<Vec<T>>, p: usize) -> Vec<Vec<T>> {
    if parts.len() == p.max(1) {
        return parts;
    }
    split_even(parts.into_iter().flatten().collect(), p)
}
