//! Capability flags derived from an operator's shape.
//!
//! A gatherer never stores these redundantly; they are computed once from which
//! functions it was built with (see `Gatherer::capabilities` in the operators
//! crate). The driver branches on these flags and never on operator identity.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Characteristic {
    /// No combiner: the operator can only ever run on one partition.
    Sequential,
    /// No initializer: every partition starts from the same empty state.
    Stateless,
    /// The integrator ignores the downstream's "wants more" signal.
    Greedy,
}

impl Characteristic {
    pub const ALL: [Characteristic; 3] = [
        Characteristic::Sequential,
        Characteristic::Stateless,
        Characteristic::Greedy,
    ];

    const fn bit(self) -> u8 {
        match self {
            Characteristic::Sequential => 1,
            Characteristic::Stateless => 1 << 1,
            Characteristic::Greedy => 1 << 2,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Characteristic::Sequential => "SEQUENTIAL",
            Characteristic::Stateless => "STATELESS",
            Characteristic::Greedy => "GREEDY",
        };
        f.write_str(s)
    }
}

/// Small copyable set of [`Characteristic`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Characteristic>", into = "Vec<Characteristic>")]
pub struct Capabilities(u8);

impl Capabilities {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_flags(sequential: bool, stateless: bool, greedy: bool) -> Self {
        let mut caps = Self::empty();
        if sequential {
            caps.insert(Characteristic::Sequential);
        }
        if stateless {
            caps.insert(Characteristic::Stateless);
        }
        if greedy {
            caps.insert(Characteristic::Greedy);
        }
        caps
    }

    pub fn insert(&mut self, c: Characteristic) {
        self.0 |= c.bit();
    }

    pub fn contains(&self, c: Characteristic) -> bool {
        self.0 & c.bit() != 0
    }

    pub fn is_sequential(&self) -> bool {
        self.contains(Characteristic::Sequential)
    }

    pub fn is_stateless(&self) -> bool {
        self.contains(Characteristic::Stateless)
    }

    pub fn is_greedy(&self) -> bool {
        self.contains(Characteristic::Greedy)
    }

    /// Iterate the contained flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Characteristic> + '_ {
        Characteristic::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Characteristic> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Characteristic>>(iter: I) -> Self {
        let mut caps = Capabilities::empty();
        for c in iter {
            caps.insert(c);
        }
        caps
    }
}

impl From<Vec<Characteristic>> for Capabilities {
    fn from(v: Vec<Characteristic>) -> Self {
        v.into_iter().collect()
    }
}

impl From<Capabilities> for Vec<Characteristic> {
    fn from(c: Capabilities) -> Self {
        c.iter().collect()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, c) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_and_display() {
        let caps = Capabilities::from_flags(true, false, true);
        assert!(caps.is_sequential());
        assert!(!caps.is_stateless());
        assert!(caps.is_greedy());
        assert_eq!(caps.to_string(), "{SEQUENTIAL, GREEDY}");
        assert_eq!(Capabilities::empty().to_string(), "{}");
    }

    #[test]
    fn test_serde_as_list() {
        let caps: Capabilities = [Characteristic::Stateless, Characteristic::Greedy]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"["STATELESS","GREEDY"]"#);
        let back: Capabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }
}
