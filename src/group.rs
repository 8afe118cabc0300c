//! Splits a tour into discussion batches.

use crate::conflicts::ConflictSet;
use crate::cost::CostMatrix;
use crate::solver::Tour;
use std::num::NonZeroUsize;

/// Papers discussed back to back while the same reviewers wait outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub papers: Vec<String>,
    /// Union of the papers' conflict sets.
    pub conflicts: ConflictSet,
}

impl Group {
    /// One paper on its own.
    pub fn single(paper: &str, conflicts: &ConflictSet) -> Self {
        Self {
            papers: vec![paper.to_string()],
            conflicts: conflicts.clone(),
        }
    }
}

/// Cuts `tour` into consecutive batches of `batch_size` (the last may be
/// shorter). Indices are resolved through the matrix that produced the tour.
pub fn split_into_groups(tour: &Tour, matrix: &CostMatrix, batch_size: NonZeroUsize) -> Vec<Group> {
    tour.order
        .chunks(batch_size.get())
        .map(|chunk| {
            let mut conflicts = ConflictSet::new();
            for &i in chunk {
                conflicts.extend(matrix.conflicts(i).iter().cloned());
            }
            Group {
                papers: chunk.iter().map(|&i| matrix.paper(i).to_string()).collect(),
                conflicts,
            }
        })
        .collect()
}
