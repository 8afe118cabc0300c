// # paper_order: Conflict-Aware Discussion Ordering
//
// Orders the papers of a program-committee meeting so that reviewers with a
// conflict of interest leave and re-enter the room as rarely as possible.
// Papers are split into score buckets; within each bucket the conflict sets
// define a distance matrix, a tour solver finds a short path through it, and
// the path is cut into discussion groups.

/// Readers for the submission, bidding and reviewer exports.
pub mod records;

/// Merged conflict sets and the per-bucket ordered conflict map.
pub mod conflicts;

/// Symmetric-difference cost matrix.
pub mod cost;

/// Tour solver interface, adapter and the bundled solvers.
pub mod solver;

pub mod group;

/// Reviewer room-movement accounting.
pub mod movement;

/// Per-bucket pipeline and the multi-bucket run.
pub mod driver;

pub mod output;

pub mod config;

pub mod error;

/// Synthetic committee exports for demos and tests.
pub mod datagen;

/// A trait for conveniently updating a value to its minimum or maximum.
pub trait SetMinMax {
    /// If `v` is less than `self`, updates `self` to `v` and returns `true`.
    /// Otherwise, returns `false`.
    fn setmin(&mut self, v: Self) -> bool;
    /// If `v` is greater than `self`, updates `self` to `v` and returns `true`.
    /// Otherwise, returns `false`.
    fn setmax(&mut self, v: Self) -> bool;
}
impl<T> SetMinMax for T
where
    T: PartialOrd,
{
    fn setmin(&mut self, v: T) -> bool {
        *self > v && {
            *self = v;
            true
        }
    }
    fn setmax(&mut self, v: T) -> bool {
        *self < v && {
            *self = v;
            true
        }
    }
}

/// Builds nested vectors, one level per `;`-separated dimension.
///
/// ```
/// use paper_order::mat;
/// let m = mat![0u32; 2; 3];
/// assert_eq!(m, vec![vec![0, 0, 0], vec![0, 0, 0]]);
/// ```
#[macro_export]
macro_rules! mat {
    ($($e:expr),*) => { vec![$($e),*] };
    ($($e:expr,)*) => { vec![$($e),*] };
    ($e:expr; $d:expr) => { vec![$e; $d] };
    ($e:expr; $d:expr $(; $ds:expr)+) => { vec![$crate::mat![$e $(; $ds)*]; $d] };
}
