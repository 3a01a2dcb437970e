use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatch::{CallFailure, CallPolicy, call_with_deadline, fan_out, with_retries};
use crate::error::EvaluationError;
use crate::tree::{NodeId, SearchTree};

/// Score assigned to a path by an [`Evaluator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Quality of the path, clamped into [0, 1] before use
    pub score: f32,

    /// The path is a complete solution
    pub solved: bool,
}

impl Evaluation {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            solved: false,
        }
    }

    pub fn solved(score: f32) -> Self {
        Self {
            score,
            solved: true,
        }
    }

    /// Clamp the score into [0, 1], rejecting NaN and infinities
    pub fn sanitized(self) -> Result<Self, EvaluationError> {
        if !self.score.is_finite() {
            return Err(EvaluationError::Malformed(format!(
                "non-finite score {}",
                self.score
            )));
        }
        Ok(Self {
            score: self.score.clamp(0.0, 1.0),
            ..self
        })
    }
}

/// Scorer for candidate paths
pub trait Evaluator<S>: Send + Sync + 'static {
    /// Score `segment` in [0, 1] and say whether it solves the task
    fn evaluate(&self, segment: &S) -> Result<Evaluation, EvaluationError>;
}

impl From<CallFailure> for EvaluationError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::TimedOut(after) => EvaluationError::TimedOut(after),
            CallFailure::Lost(msg) => EvaluationError::Unavailable(msg),
            CallFailure::Interrupted => EvaluationError::Interrupted,
        }
    }
}

/// Evaluation outcome for one freshly created child
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChild {
    pub node_id: NodeId,
    pub result: Result<Evaluation, EvaluationError>,
    pub retries: u32,
}

/// Evaluate a batch of children on up to `concurrency` threads
///
/// The tree is only read here; results come back in the order of `children`
/// so the caller can apply them deterministically.
pub fn evaluate_batch<S, V>(
    tree: &SearchTree<S>,
    children: &[NodeId],
    evaluator: &Arc<V>,
    concurrency: usize,
    policy: CallPolicy,
) -> Vec<ScoredChild>
where
    S: Clone + Send + 'static,
    V: Evaluator<S>,
{
    let jobs: Vec<(NodeId, S)> = children
        .iter()
        .map(|&id| (id, tree.get(id).segment().clone()))
        .collect();

    fan_out(jobs, concurrency, |(node_id, segment)| {
        let (result, retries) = evaluate_one(evaluator, segment, policy);
        match &result {
            Err(EvaluationError::Interrupted) => {
                debug!(node = %node_id, "evaluation interrupted by deadline");
            }
            Err(err) => warn!(node = %node_id, error = %err, "evaluation failed"),
            Ok(_) => {}
        }
        ScoredChild {
            node_id,
            result,
            retries,
        }
    })
}

fn evaluate_one<S, V>(
    evaluator: &Arc<V>,
    segment: S,
    policy: CallPolicy,
) -> (Result<Evaluation, EvaluationError>, u32)
where
    S: Clone + Send + 'static,
    V: Evaluator<S>,
{
    with_retries(policy, "evaluate", |timeout| {
        let evaluator = Arc::clone(evaluator);
        let segment = segment.clone();
        call_with_deadline(timeout, move || evaluator.evaluate(&segment))
            .unwrap_or_else(|failure| Err(failure.into()))
            .and_then(Evaluation::sanitized)
    })
}
