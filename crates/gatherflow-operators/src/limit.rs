//! Counting-bound limiter.

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::Downstream;

/// Pass through at most `n` elements, then stop consuming.
///
/// The integrator reports `false` right after accepting the `n`-th element,
/// so it is invoked exactly `min(n, len)` times (once for `n == 0`). The
/// count is a single global position, hence SEQUENTIAL.
pub fn limit<T>(n: usize) -> Gatherer<T, usize, T>
where
    T: Send + 'static,
{
    Gatherer::of_sequential(
        || 0usize,
        Integrator::of(move |taken: &mut usize, element: T, downstream: &mut dyn Downstream<T>| {
            if *taken >= n {
                return Ok(false);
            }
            *taken += 1;
            Ok(downstream.push(element) && *taken < n)
        }),
    )
    .named("limit")
}
