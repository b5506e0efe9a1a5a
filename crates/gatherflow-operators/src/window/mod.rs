//! Windowing operators: group consecutive elements into `Vec`s.
//!
//! Both operators buffer in their state cell and are SEQUENTIAL: a window may
//! straddle any partition boundary the driver would pick.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::Downstream;

/// Non-overlapping windows of `size` elements; the last one may be short.
///
/// For `k` input elements this emits `ceil(k / size)` windows.
pub fn window_fixed<T>(size: NonZeroUsize) -> Gatherer<T, Vec<T>, Vec<T>>
where
    T: Send + 'static,
{
    let size = size.get();
    Gatherer::of_sequential_with_finisher(
        move || Vec::with_capacity(size),
        Integrator::greedy(
            move |window: &mut Vec<T>, element: T, downstream: &mut dyn Downstream<Vec<T>>| {
                window.push(element);
                if window.len() == size {
                    let full = std::mem::replace(window, Vec::with_capacity(size));
                    downstream.push(full);
                }
                Ok(true)
            },
        ),
        |window: Vec<T>, downstream: &mut dyn Downstream<Vec<T>>| {
            if !window.is_empty() {
                downstream.push(window);
            }
            Ok(())
        },
    )
    .named("window_fixed")
}

/// Overlapping windows of exactly `size` elements, advancing by one.
///
/// For `k` input elements this emits `k - size + 1` windows, or none when
/// `k < size`.
pub fn window_sliding<T>(size: NonZeroUsize) -> Gatherer<T, VecDeque<T>, Vec<T>>
where
    T: Clone + Send + 'static,
{
    let size = size.get();
    Gatherer::of_sequential(
        move || VecDeque::with_capacity(size),
        Integrator::greedy(
            move |window: &mut VecDeque<T>, element: T, downstream: &mut dyn Downstream<Vec<T>>| {
                window.push_back(element);
                if window.len() == size {
                    downstream.push(window.iter().cloned().collect());
                    window.pop_front();
                }
                Ok(true)
            },
        ),
    )
    .named("window_sliding")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn run<S>(g: &Gatherer<i32, S, Vec<i32>>, input: std::ops::Range<i32>) -> Vec<Vec<i32>> {
        let mut state = g.initialize();
        let mut out = Vec::new();
        for x in input {
            g.integrate(&mut state, x, &mut out).unwrap();
        }
        g.finish(state, &mut out).unwrap();
        out
    }

    #[test]
    fn test_window_fixed_last_window_short() {
        let out = run(&window_fixed(nz(3)), 0..7);
        assert_eq!(out, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
        assert!(run(&window_fixed(nz(3)), 0..0).is_empty());
    }

    #[test]
    fn test_window_sliding_counts() {
        let out = run(&window_sliding(nz(3)), 0..5);
        assert_eq!(out, vec![vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 4]]);
        assert!(run(&window_sliding(nz(3)), 0..2).is_empty());
        assert_eq!(run(&window_sliding(nz(1)), 0..3).len(), 3);
    }
}
