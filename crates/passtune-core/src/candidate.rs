use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Index into the pass catalog. The catalog tops out in the low hundreds,
/// but u16 leaves headroom for user-supplied catalogs.
pub type PassIndex = u16;

/// Fitness assigned to a candidate whose evaluation failed at any stage.
/// Keeps the objective totally ordered: a broken pass sequence is simply the
/// worst possible one.
pub const WORST_FITNESS: f64 = f64::MAX;

/// An ordered sequence of pass indices; one point in the search space.
/// Order matters and repeated passes are legal, distinct operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    genes: Vec<PassIndex>,
}

impl Candidate {
    pub fn new(genes: Vec<PassIndex>) -> Self {
        Self { genes }
    }

    pub fn genes(&self) -> &[PassIndex] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut Vec<PassIndex> {
        &mut self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Canonical string form, e.g. `[4, 0, 17]`. This is the archive key:
    /// identical sequences collapse to one entry, any positional difference
    /// yields a different key. The format matches archives produced by
    /// earlier tooling, so old runs stay resumable.
    pub fn canonical_key(&self) -> String {
        format!("[{}]", self.genes.iter().join(", "))
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

/// A candidate together with its (memoized or freshly computed) fitness.
/// Lower is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub fitness: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_key_format() {
        let c = Candidate::new(vec![4, 0, 17]);
        assert_eq!(c.canonical_key(), "[4, 0, 17]");
    }

    #[test]
    fn canonical_key_empty() {
        let c = Candidate::new(vec![]);
        assert_eq!(c.canonical_key(), "[]");
    }

    #[test]
    fn canonical_key_is_order_sensitive() {
        let a = Candidate::new(vec![1, 2, 3]);
        let b = Candidate::new(vec![1, 3, 2]);
        assert_ne!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn canonical_key_separates_adjacent_digits() {
        // [1, 2] must never collide with [12]
        let a = Candidate::new(vec![1, 2]);
        let b = Candidate::new(vec![12]);
        assert_ne!(a.canonical_key(), b.canonical_key());
    }

    proptest! {
        #[test]
        fn prop_canonical_key_bijective(
            a in prop::collection::vec(0u16..134, 30),
            b in prop::collection::vec(0u16..134, 30),
        ) {
            let ca = Candidate::new(a.clone());
            let cb = Candidate::new(b.clone());
            prop_assert_eq!(a == b, ca.canonical_key() == cb.canonical_key());
        }
    }
}
