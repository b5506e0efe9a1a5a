//! Downstream sink trait + the operator error type.
//!
//! The driver hands every integrator and finisher a `&mut dyn Downstream<Out>`
//! that stands for "the rest of the pipeline". Pushing returns whether the
//! rest of the pipeline still wants elements.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    /// A user-supplied function failed while processing an element or state.
    #[error("execution error: {0}")]
    Exec(String),

    /// `combine` was requested from a gatherer built without a combiner.
    #[error("operator cannot combine partial states: {0}")]
    NotCombinable(String),

    /// A concurrently running transformation panicked or was cancelled.
    #[error("concurrent task failed: {0}")]
    Concurrency(String),

    /// The shared runtime for concurrent operators could not be started.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// The receiving end of an operator.
///
/// Invariants:
/// - `push` returns `false` once the consumer wants no more elements.
/// - Pushing after a `false` must not panic; implementations drop the value
///   and keep returning `false`.
pub trait Downstream<T> {
    fn push(&mut self, value: T) -> bool;

    /// True once this sink has refused, or will refuse, every further push.
    fn is_rejecting(&self) -> bool {
        false
    }
}

impl<T, D: Downstream<T> + ?Sized> Downstream<T> for &mut D {
    fn push(&mut self, value: T) -> bool {
        (**self).push(value)
    }

    fn is_rejecting(&self) -> bool {
        (**self).is_rejecting()
    }
}

/// Partition-local buffers: accept everything, in order.
impl<T> Downstream<T> for Vec<T> {
    fn push(&mut self, value: T) -> bool {
        Vec::push(self, value);
        true
    }
}
