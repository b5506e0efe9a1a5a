//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// How many partitions the driver may split a stage into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "partitions")]
pub enum Parallelism {
    /// Always one partition per stage; the fully lazy push path.
    Sequential,
    /// Up to `n` partitions for stages that can combine, one for SEQUENTIAL stages.
    Auto(usize),
    /// Exactly `n` partitions for every stage. A SEQUENTIAL stage or an
    /// unsplittable source makes the run fail before any element is pulled.
    Exact(usize),
}

impl Parallelism {
    /// Upper bound on partitions requested by this policy.
    pub fn requested(&self) -> usize {
        match *self {
            Parallelism::Sequential => 1,
            Parallelism::Auto(n) | Parallelism::Exact(n) => n,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Parallelism::Exact(n) if *n > 1)
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Auto(4)
    }
}

impl FromStr for Parallelism {
    type Err = Error;

    /// Accepts `sequential`, `auto:N`, `exact:N` or a bare `N` (auto).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "sequential" {
            return Ok(Parallelism::Sequential);
        }
        let parse_n = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| Error::Config(format!("invalid partition count '{v}'")))
        };
        if let Some(n) = s.strip_prefix("auto:") {
            return Ok(Parallelism::Auto(parse_n(n)?));
        }
        if let Some(n) = s.strip_prefix("exact:") {
            return Ok(Parallelism::Exact(parse_n(n)?));
        }
        Ok(Parallelism::Auto(parse_n(&s)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Partitioning policy applied to every stage of a run.
    pub parallelism: Parallelism,

    /// A parallel stage never gets partitions shorter than this (except the
    /// last one); small inputs therefore run on fewer partitions.
    pub min_partition_len: usize,

    /// Report pushes made after a downstream refusal as contract violations
    /// instead of only counting them.
    pub strict_contracts: bool,

    /// Suggested in-flight bound for concurrent mapping operators.
    pub max_concurrency_hint: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::default(),
            min_partition_len: 1,
            strict_contracts: false,
            max_concurrency_hint: 16,
        }
    }
}

impl EngineConfig {
    pub fn sequential() -> Self {
        Self {
            parallelism: Parallelism::Sequential,
            ..Self::default()
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `GATHERFLOW_PARALLELISM`: `sequential`, `auto:N`, `exact:N` or `N`
    /// - `GATHERFLOW_MIN_PARTITION_LEN`: minimum elements per partition
    /// - `GATHERFLOW_STRICT_CONTRACTS`: `true`/`false`
    /// - `GATHERFLOW_MAX_CONCURRENCY`: in-flight hint for concurrent mapping
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("GATHERFLOW_PARALLELISM") {
            if let Ok(v) = s.parse::<Parallelism>() {
                cfg.parallelism = v;
            }
        }

        if let Ok(s) = std::env::var("GATHERFLOW_MIN_PARTITION_LEN") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.min_partition_len = v;
            }
        }

        if let Ok(s) = std::env::var("GATHERFLOW_STRICT_CONTRACTS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.strict_contracts = v;
            }
        }

        if let Ok(s) = std::env::var("GATHERFLOW_MAX_CONCURRENCY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_concurrency_hint = v;
            }
        }

        cfg
    }

    /// Reject settings the driver cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism.requested() == 0 {
            return Err(Error::Config("parallelism must request at least one partition".into()));
        }
        if self.min_partition_len == 0 {
            return Err(Error::Config("min_partition_len must be at least 1".into()));
        }
        if self.max_concurrency_hint == 0 {
            return Err(Error::Config("max_concurrency_hint must be at least 1".into()));
        }
        Ok(())
    }
}
