//! Folding and scanning: running aggregates over the element stream.

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::{Downstream, OpError};

/// Reduce the whole input to one value, emitted by the finisher.
///
/// Emits `init()` for an empty input.
pub fn fold<T, R, I, F>(init: I, folder: F) -> Gatherer<T, Option<R>, R>
where
    T: Send + 'static,
    R: Send + 'static,
    I: Fn() -> R + Send + Sync + 'static,
    F: Fn(R, T) -> R + Send + Sync + 'static,
{
    Gatherer::of_sequential_with_finisher(
        move || Some(init()),
        Integrator::greedy(
            move |acc: &mut Option<R>, element: T, _: &mut dyn Downstream<R>| {
                let current = acc
                    .take()
                    .ok_or_else(|| OpError::Exec("fold accumulator already consumed".into()))?;
                *acc = Some(folder(current, element));
                Ok(true)
            },
        ),
        finish_accumulator,
    )
    .named("fold")
}

/// Like [`fold`], but partial accumulators of adjacent partitions can be
/// merged with `merge`, so the driver may split the input.
///
/// `init()` must be an identity for `merge`: every partition starts from it.
pub fn fold_parallel<T, R, I, F, M>(init: I, folder: F, merge: M) -> Gatherer<T, Option<R>, R>
where
    T: Send + 'static,
    R: Send + 'static,
    I: Fn() -> R + Send + Sync + 'static,
    F: Fn(R, T) -> R + Send + Sync + 'static,
    M: Fn(R, R) -> R + Send + Sync + 'static,
{
    Gatherer::of(
        move || Some(init()),
        Integrator::greedy(
            move |acc: &mut Option<R>, element: T, _: &mut dyn Downstream<R>| {
                let current = acc
                    .take()
                    .ok_or_else(|| OpError::Exec("fold accumulator already consumed".into()))?;
                *acc = Some(folder(current, element));
                Ok(true)
            },
        ),
        move |left: Option<R>, right: Option<R>| match (left, right) {
            (Some(l), Some(r)) => Ok(Some(merge(l, r))),
            (l, r) => Ok(l.or(r)),
        },
        finish_accumulator,
    )
    .named("fold_parallel")
}

fn finish_accumulator<R>(acc: Option<R>, downstream: &mut dyn Downstream<R>) -> Result<(), OpError> {
    if let Some(value) = acc {
        downstream.push(value);
    }
    Ok(())
}

/// Emit every intermediate accumulator: `f(init, e1)`, `f(f(init, e1), e2)`, ...
pub fn scan<T, R, I, F>(init: I, scanner: F) -> Gatherer<T, R, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
    I: Fn() -> R + Send + Sync + 'static,
    F: Fn(&R, T) -> R + Send + Sync + 'static,
{
    Gatherer::of_sequential(
        init,
        Integrator::of(move |acc: &mut R, element: T, downstream: &mut dyn Downstream<R>| {
            *acc = scanner(acc, element);
            Ok(downstream.push(acc.clone()))
        }),
    )
    .named("scan")
}
