//! Terminal consumers usable as the last `Downstream` of a pipeline.

use crate::traits::Downstream;

/// Collects every element, in order. Never refuses.
#[derive(Debug)]
pub struct Collect<T> {
    items: Vec<T>,
}

impl<T> Collect<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Collect<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Downstream<T> for Collect<T> {
    fn push(&mut self, value: T) -> bool {
        self.items.push(value);
        true
    }
}

/// Bounded consumer: keeps the first `limit` elements, then refuses.
///
/// The push that fills the bound is accepted and answered with `false`, so
/// upstream operators can stop before producing anything else.
#[derive(Debug)]
pub struct Take<T> {
    items: Vec<T>,
    limit: usize,
    late_pushes: u64,
}

impl<T> Take<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit.min(1024)),
            limit,
            late_pushes: 0,
        }
    }

    /// Keep only the first element.
    pub fn first() -> Self {
        Self::new(1)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Pushes received after the bound was reached (dropped).
    pub fn late_pushes(&self) -> u64 {
        self.late_pushes
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn into_first(self) -> Option<T> {
        self.items.into_iter().next()
    }
}

impl<T> Downstream<T> for Take<T> {
    fn push(&mut self, value: T) -> bool {
        if self.items.len() >= self.limit {
            self.late_pushes += 1;
            return false;
        }
        self.items.push(value);
        self.items.len() < self.limit
    }

    fn is_rejecting(&self) -> bool {
        self.items.len() >= self.limit
    }
}

/// Adapts a closure `FnMut(T) -> bool` into a consumer.
///
/// After the closure answers `false` once, later pushes are dropped without
/// calling it again.
pub struct FnSink<F> {
    f: F,
    refused: bool,
}

impl<F> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self { f, refused: false }
    }
}

impl<T, F> Downstream<T> for FnSink<F>
where
    F: FnMut(T) -> bool,
{
    fn push(&mut self, value: T) -> bool {
        if self.refused {
            return false;
        }
        if !(self.f)(value) {
            self.refused = true;
        }
        !self.refused
    }

    fn is_rejecting(&self) -> bool {
        self.refused
    }
}
