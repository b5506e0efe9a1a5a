//! Element-wise mapping operators.

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::Downstream;

/// One output per input. Stateless and greedy, so the driver may split it freely.
pub fn map<T, R, F>(mapper: F) -> Gatherer<T, (), R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    Gatherer::stateless(Integrator::greedy(
        move |_: &mut (), element: T, downstream: &mut dyn Downstream<R>| {
            downstream.push(mapper(element));
            Ok(true)
        },
    ))
    .named("map")
}

/// Same as [`map`] but pinned to a single partition.
pub fn map_sequential<T, R, F>(mapper: F) -> Gatherer<T, (), R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    Gatherer::stateless_sequential(Integrator::greedy(
        move |_: &mut (), element: T, downstream: &mut dyn Downstream<R>| {
            downstream.push(mapper(element));
            Ok(true)
        },
    ))
    .named("map_sequential")
}

/// Zero or more outputs per input; `expand` pushes them itself.
///
/// Stops consuming as soon as the downstream refuses.
pub fn flat_map<T, R, F>(expand: F) -> Gatherer<T, (), R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, &mut dyn FnMut(R)) + Send + Sync + 'static,
{
    Gatherer::stateless(Integrator::of(
        move |_: &mut (), element: T, downstream: &mut dyn Downstream<R>| {
            let mut wants_more = true;
            expand(element, &mut |value: R| {
                if wants_more {
                    wants_more = downstream.push(value);
                }
            });
            Ok(wants_more)
        },
    ))
    .named("flat_map")
}
