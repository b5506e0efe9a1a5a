//! Filtering operators.

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::Downstream;

pub fn filter<T, P>(predicate: P) -> Gatherer<T, (), T>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Gatherer::stateless(Integrator::greedy(
        move |_: &mut (), element: T, downstream: &mut dyn Downstream<T>| {
            if predicate(&element) {
                downstream.push(element);
            }
            Ok(true)
        },
    ))
    .named("filter")
}

/// Drop elements equal to their predecessor.
pub fn dedup_consecutive<T>() -> Gatherer<T, Option<T>, T>
where
    T: PartialEq + Clone + Send + 'static,
{
    Gatherer::of_sequential(
        || None,
        Integrator::greedy(
            |last: &mut Option<T>, element: T, downstream: &mut dyn Downstream<T>| {
                if last.as_ref() != Some(&element) {
                    *last = Some(element.clone());
                    downstream.push(element);
                }
                Ok(true)
            },
        ),
    )
    .named("dedup_consecutive")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_consecutive() {
        let g = dedup_consecutive();
        let mut state = g.initialize();
        let mut out = Vec::new();
        for x in [1, 1, 2, 2, 2, 1, 3, 3] {
            g.integrate(&mut state, x, &mut out).unwrap();
        }
        assert_eq!(out, vec![1, 2, 1, 3]);
    }

    #[test]
    fn test_filter_keeps_matches() {
        let g = filter(|x: &i32| x % 2 == 0);
        let mut out = Vec::new();
        for x in 0..6 {
            g.integrate(&mut (), x, &mut out).unwrap();
        }
        assert_eq!(out, vec![0, 2, 4]);
    }
}
