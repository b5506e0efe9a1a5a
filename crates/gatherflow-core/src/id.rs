//! Positional identifiers.
//!
//! Stages and partitions are named by where they sit: a stage by its index in
//! the pipeline, a partition by its place in input order. Both serialize as
//! plain integers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! position_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            pub const fn index(self) -> usize {
                self.0
            }

            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

// Head of the pipeline is stage 0.
position_id!(StageId, "stage");
// Leftmost partition is 0; combine and concatenation follow this order.
position_id!(PartitionId, "partition");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_and_order() {
        let head = StageId::new(0);
        assert_eq!(head.to_string(), "stage#0");
        assert_eq!(head.next(), StageId::new(1));
        assert!(head < head.next());
        assert_eq!(PartitionId::new(3).to_string(), "partition#3");
        assert_eq!(serde_json::to_string(&PartitionId::new(3)).unwrap(), "3");
    }
}
