//! Typed errors for the parts of the pipeline whose failure modes callers
//! need to tell apart. Everything I/O-shaped goes through `anyhow` instead.

use thiserror::Error;

/// A tour solver produced something that is not a permutation of `0..n`, or
/// failed outright. Fatal for the bucket and the run.
#[derive(Debug, Error)]
pub enum TourError {
    #[error("solver {solver} returned {got} indices for {expected} papers")]
    WrongLength {
        solver: String,
        expected: usize,
        got: usize,
    },
    #[error("solver {solver} returned index {index}, but only {n} papers exist")]
    OutOfRange {
        solver: String,
        index: usize,
        n: usize,
    },
    #[error("solver {solver} visited index {index} more than once")]
    Duplicate { solver: String, index: usize },
    #[error("solver {solver} failed: {source}")]
    Failed {
        solver: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("score steps need at least two boundaries, got {0}")]
    TooFewSteps(usize),
    #[error("score step {0} is not a finite number")]
    NonFiniteStep(f64),
    #[error("score steps must be strictly ascending ({prev} is followed by {next})")]
    NotAscending { prev: f64, next: f64 },
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("unknown solver '{0}' (expected auto, exact or local-search)")]
    UnknownSolver(String),
    #[error("no submission CSV configured")]
    MissingSubmissions,
    #[error("no bidding CSV configured")]
    MissingBidding,
}
