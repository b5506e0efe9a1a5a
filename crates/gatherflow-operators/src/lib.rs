#![forbid(unsafe_code)]
//! gatherflow-operators: the gatherer contract plus reference operators.
//!
//! Design intent:
//! - A `Gatherer` is an immutable bundle of initializer, integrator, combiner
//!   and finisher. It owns no per-run state; state cells are created by the
//!   driver (`gatherflow-exec`) for each partition and moved through the
//!   lifecycle `initialize -> integrate* -> combine? -> finish`.
//! - Everything here is synchronous except `map_concurrent`, which fans work
//!   out to a shared tokio runtime and still emits in input order.

pub mod gatherer;
pub mod sink;
pub mod traits;

pub mod concurrent;
pub mod filter;
pub mod find;
pub mod fold;
pub mod limit;
pub mod map;
pub mod window;

pub use gatherer::{Gatherer, Integrator};
pub use sink::{Collect, FnSink, Take};
pub use traits::{Downstream, OpError};

pub use concurrent::map_concurrent;
pub use filter::{dedup_consecutive, filter};
pub use find::{find_index, find_indexes};
pub use fold::{fold, fold_parallel, scan};
pub use limit::limit;
pub use map::{flat_map, map, map_sequential};
pub use window::{window_fixed, window_sliding};
