//! Element sources.
//!
//! A source either splits into contiguous, order-preserving partitions
//! (finite, in-memory) or declares itself unsplittable, which pins every stage
//! to a single partition and keeps the run lazy.

use crate::scheduler::split_even;

pub trait Source<T> {
    type Elements: Iterator<Item = T>;

    /// Whether `split` may be called with more than one partition.
    fn is_splittable(&self) -> bool;

    /// Number of elements, when known up front.
    fn size_hint(&self) -> Option<usize> {
        None
    }

    /// Split into `partitions` contiguous chunks of near-equal length.
    fn split(self, partitions: usize) -> Vec<Vec<T>>;

    /// Lazy element-by-element view, used by the fused path.
    fn into_elements(self) -> Self::Elements;
}

/// Finite in-memory source; splittable.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for VecSource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for VecSource<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> Source<T> for VecSource<T> {
    type Elements = std::vec::IntoIter<T>;

    fn is_splittable(&self) -> bool {
        true
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn split(self, partitions: usize) -> Vec<Vec<T>> {
        split_even(self.items, partitions)
    }

    fn into_elements(self) -> Self::Elements {
        self.items.into_iter()
    }
}

impl<T> Source<T> for Vec<T> {
    type Elements = std::vec::IntoIter<T>;

    fn is_splittable(&self) -> bool {
        true
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    fn split(self, partitions: usize) -> Vec<Vec<T>> {
        split_even(self, partitions)
    }

    fn into_elements(self) -> Self::Elements {
        self.into_iter()
    }
}

/// Wraps any iterator, possibly infinite. Never split.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator> Source<I::Item> for IterSource<I> {
    type Elements = I;

    fn is_splittable(&self) -> bool {
        false
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lo, Some(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    /// Materializes everything into one chunk; the driver only calls this for
    /// splittable sources.
    fn split(self, _partitions: usize) -> Vec<Vec<I::Item>> {
        vec![self.iter.collect()]
    }

    fn into_elements(self) -> Self::Elements {
        self.iter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source_splits_contiguously() {
        let parts = VecSource::from((0..7).collect::<Vec<i32>>()).split(3);
        assert_eq!(parts, vec![vec![0, 1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn test_iter_source_is_lazy_and_unsplittable() {
        let src = IterSource::new(0u64..);
        assert!(!src.is_splittable());
        assert_eq!(src.size_hint(), None);
        let first: Vec<u64> = src.into_elements().take(3).collect();
        assert_eq!(first, vec![0, 1, 2]);
    }
}
