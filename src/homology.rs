//! Homology modules as kernel and torsion dimensions.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// The result of diagonalizing the differentials of a chain complex.
///
/// `kern[n]` is the dimension of the kernel of the n-th differential and
/// `tors[n]` the rank of the (n+1)-st, so the n-th homology module has
/// dimension `kern[n] - tors[n]`. Entries that were never computed count as
/// zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomologyField {
    kern: BTreeMap<i32, i32>,
    tors: BTreeMap<i32, i32>,
}

impl HomologyField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_kern(&mut self, n: i32, dimension: i32) {
        self.kern.insert(n, dimension);
    }

    pub fn kern(&self, n: i32) -> i32 {
        self.kern.get(&n).copied().unwrap_or(0)
    }

    pub fn erase_kern(&mut self, n: i32) {
        self.kern.remove(&n);
    }

    pub fn set_tors(&mut self, n: i32, rank: i32) {
        self.tors.insert(n, rank);
    }

    pub fn tors(&self, n: i32) -> i32 {
        self.tors.get(&n).copied().unwrap_or(0)
    }

    pub fn erase_tors(&mut self, n: i32) {
        self.tors.remove(&n);
    }

    /// The dimension of the n-th homology module.
    pub fn dimension(&self, n: i32) -> i32 {
        self.kern(n) - self.tors(n)
    }

    /// Merges the entries of `other` into `self`, overwriting on collision.
    pub fn absorb(&mut self, other: HomologyField) {
        self.kern.extend(other.kern);
        self.tors.extend(other.tors);
    }

    /// Degrees for which either a kernel or a torsion entry exists.
    pub fn degrees(&self) -> impl Iterator<Item = i32> + '_ {
        let mut degrees: Vec<i32> = self.kern.keys().chain(self.tors.keys()).copied().collect();
        degrees.sort_unstable();
        degrees.dedup();
        degrees.into_iter()
    }
}

impl fmt::Display for HomologyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in self.degrees() {
            writeln!(
                f,
                "Homology module H_{n}: dimension = {} (kernel {}, torsion {})",
                self.dimension(n),
                self.kern(n),
                self.tors(n)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_combine_kernel_and_torsion() {
        let mut h = HomologyField::new();
        h.set_kern(1, 3);
        h.set_tors(1, 2);
        assert_eq!(h.dimension(1), 1);
        // Degrees without entries count as zero.
        assert_eq!(h.dimension(7), 0);
    }

    #[test]
    fn absorb_overwrites() {
        let mut a = HomologyField::new();
        a.set_kern(0, 1);
        let mut b = HomologyField::new();
        b.set_kern(0, 5);
        b.set_tors(2, 1);
        a.absorb(b);
        assert_eq!(a.kern(0), 5);
        assert_eq!(a.tors(2), 1);
    }

    #[test]
    fn serializes_with_its_degrees() {
        let mut h = HomologyField::new();
        h.set_kern(2, 4);
        h.set_tors(2, 1);
        let json = serde_json::to_string(&h).unwrap();
        let back: HomologyField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert_eq!(back.dimension(2), 3);
    }

    #[test]
    fn display_lists_degrees_in_order() {
        let mut h = HomologyField::new();
        h.set_kern(1, 1);
        h.set_kern(0, 1);
        let text = h.to_string();
        let first = text.find("H_0").unwrap();
        let second = text.find("H_1").unwrap();
        assert!(first < second);
    }
}
