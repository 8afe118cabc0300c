//! # Cost Matrix
//!
//! Distance between two papers is the number of reviewers who would have to
//! move when discussion passes from one to the other: the size of the
//! symmetric difference of their conflict sets.
//!
//! The matrix owns the paper order it was built with. Grouping resolves tour
//! indices through that same list, never through a re-derived one.

use crate::conflicts::{ConflictMap, ConflictSet};
use crate::mat;

#[derive(Debug, Clone)]
pub struct CostMatrix {
    papers: Vec<String>,
    conflicts: Vec<ConflictSet>,
    cost: Vec<Vec<u32>>,
}

/// |a ⊕ b|
pub fn conflict_distance(a: &ConflictSet, b: &ConflictSet) -> u32 {
    a.symmetric_difference(b).count() as u32
}

impl CostMatrix {
    pub fn build(map: &ConflictMap) -> Self {
        let (papers, conflicts): (Vec<String>, Vec<ConflictSet>) =
            map.entries().iter().cloned().unzip();
        let n = papers.len();
        let mut cost = mat![0u32; n; n];
        for i in 0..n {
            for j in 0..n {
                cost[i][j] = conflict_distance(&conflicts[i], &conflicts[j]);
            }
        }
        Self {
            papers,
            conflicts,
            cost,
        }
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.cost[i][j]
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.cost
    }

    /// Paper id at matrix index `i`.
    pub fn paper(&self, i: usize) -> &str {
        &self.papers[i]
    }

    pub fn papers(&self) -> &[String] {
        &self.papers
    }

    pub fn conflicts(&self, i: usize) -> &ConflictSet {
        &self.conflicts[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::set;
    use rand::prelude::*;

    fn map(entries: &[(&str, &[&str])]) -> ConflictMap {
        ConflictMap::from_entries(entries.iter().map(|(p, rs)| (p.to_string(), set(rs))).collect())
    }

    #[test]
    fn three_paper_scenario() {
        let m = CostMatrix::build(&map(&[("A", &[]), ("B", &["r1"]), ("C", &["r1"])]));
        assert_eq!(m.rows(), &[vec![0, 1, 1], vec![1, 0, 0], vec![1, 0, 0]]);
        assert_eq!(m.papers(), ["A", "B", "C"]);
    }

    #[test]
    fn single_and_empty() {
        let one = CostMatrix::build(&map(&[("A", &["r1", "r2"])]));
        assert_eq!(one.rows(), &[vec![0]]);
        let none = CostMatrix::build(&ConflictMap::default());
        assert!(none.is_empty());
        assert!(none.rows().is_empty());
    }

    #[test]
    fn counts_symmetric_difference() {
        let a = set(&["r1", "r2", "r3"]);
        let b = set(&["r3", "r4"]);
        assert_eq!(conflict_distance(&a, &b), 3);
        assert_eq!(conflict_distance(&a, &a), 0);
        assert_eq!(conflict_distance(&set(&[]), &set(&[])), 0);
    }

    #[test]
    fn random_matrices_are_symmetric_with_zero_diagonal() {
        let mut rng = StdRng::seed_from_u64(7);
        let reviewers: Vec<String> = (0..8).map(|r| format!("r{}", r)).collect();
        for _ in 0..50 {
            let n = rng.random_range(0..12);
            let entries = (0..n)
                .map(|i| {
                    let conflicts = reviewers
                        .iter()
                        .filter(|_| rng.random_bool(0.3))
                        .cloned()
                        .collect();
                    (format!("p{}", i), conflicts)
                })
                .collect();
            let m = CostMatrix::build(&ConflictMap::from_entries(entries));
            for i in 0..n {
                assert_eq!(m.get(i, i), 0);
                for j in 0..n {
                    assert_eq!(m.get(i, j), m.get(j, i));
                    if m.conflicts(i) == m.conflicts(j) {
                        assert_eq!(m.get(i, j), 0);
                    }
                }
            }
        }
    }
}
