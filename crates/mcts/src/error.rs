use std::time::Duration;

use thiserror::Error;

/// Failure reported by an [`Expander`](crate::Expander) call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpansionError {
    #[error("Expander unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed expansion output: {0}")]
    Malformed(String),

    #[error("Expansion timed out after {0:?}")]
    TimedOut(Duration),

    /// The search ran out of time before the call answered
    #[error("Expansion interrupted by the search deadline")]
    Interrupted,
}

/// Failure reported by an [`Evaluator`](crate::Evaluator) call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed evaluation output: {0}")]
    Malformed(String),

    #[error("Evaluation timed out after {0:?}")]
    TimedOut(Duration),

    /// The search ran out of time before the call answered
    #[error("Evaluation interrupted by the search deadline")]
    Interrupted,
}

/// Errors that abort a search run
///
/// Collaborator failures are not in here: they prune the offending node and
/// the run carries on. Calls cut off by the time budget leave the node
/// untouched instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid node ID: {0}")]
    InvalidNodeId(usize),

    #[error("Tree invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
