//! Index search over the element stream.

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::Downstream;

/// Emit the position of the first element matching `predicate`, then stop.
///
/// Positions are counted from the start of the whole input, so the operator is
/// SEQUENTIAL. Running it over a reversed input locates the last match of the
/// original order (relative to the reversed sequence).
pub fn find_index<T, P>(predicate: P) -> Gatherer<T, usize, usize>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Gatherer::of_sequential(
        || 0usize,
        Integrator::of(
            move |next: &mut usize, element: T, downstream: &mut dyn Downstream<usize>| {
                let index = *next;
                *next += 1;
                if predicate(&element) {
                    downstream.push(index);
                    return Ok(false);
                }
                Ok(true)
            },
        ),
    )
    .named("find_index")
}

/// Emit the position of every element matching `predicate`.
pub fn find_indexes<T, P>(predicate: P) -> Gatherer<T, usize, usize>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Gatherer::of_sequential(
        || 0usize,
        Integrator::greedy(
            move |next: &mut usize, element: T, downstream: &mut dyn Downstream<usize>| {
                let index = *next;
                *next += 1;
                if predicate(&element) {
                    downstream.push(index);
                }
                Ok(true)
            },
        ),
    )
    .named("find_indexes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<T>(g: &Gatherer<T, usize, usize>, input: Vec<T>) -> Vec<usize> {
        let mut state = g.initialize();
        let mut out = Vec::new();
        for x in input {
            if !g.integrate(&mut state, x, &mut out).unwrap() {
                break;
            }
        }
        g.finish(state, &mut out).unwrap();
        out
    }

    #[test]
    fn test_find_index_first_match() {
        let g = find_index(|s: &&str| s.contains('o'));
        assert_eq!(run(&g, vec!["bar", "foo", "boo"]), vec![1]);
        assert_eq!(run(&g, vec!["bar", "baz"]), Vec::<usize>::new());
    }

    #[test]
    fn test_find_indexes_all_matches() {
        let g = find_indexes(|x: &i32| x % 3 == 0);
        assert_eq!(run(&g, (1..=10).collect()), vec![2, 5, 8]);
        assert!(g.capabilities().is_greedy());
    }
}
