use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatch::{CallFailure, CallPolicy, call_with_deadline, with_retries};
use crate::error::{ExpansionError, Result};
use crate::tree::{NodeId, SearchTree};

/// Generator of candidate next steps
pub trait Expander<S>: Send + Sync + 'static {
    /// Propose up to `max_candidates` continuations of `segment`, which sits at `depth`
    ///
    /// An empty list means there are no further moves from here.
    fn expand(
        &self,
        segment: &S,
        depth: usize,
        max_candidates: usize,
    ) -> std::result::Result<Vec<S>, ExpansionError>;
}

impl From<CallFailure> for ExpansionError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::TimedOut(after) => ExpansionError::TimedOut(after),
            CallFailure::Lost(msg) => ExpansionError::Unavailable(msg),
            CallFailure::Interrupted => ExpansionError::Interrupted,
        }
    }
}

/// What happened to a node handed to the expander
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// New children, in creation order
    Expanded(Vec<NodeId>),

    /// No further moves; the node is now terminal
    Exhausted,

    /// Every attempt failed; the node is now pruned
    Failed(ExpansionError),

    /// The time budget ran out first; the node is left as it was
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionReport {
    pub outcome: ExpansionOutcome,
    pub retries: u32,
}

/// Expand a frontier node into fresh children
///
/// Marks the node terminal when the expander has nothing to offer and
/// pruned when it keeps failing. Children start with zero visits. A call cut
/// off by the run's deadline changes nothing.
pub fn expand_node<S, X>(
    tree: &mut SearchTree<S>,
    node_id: NodeId,
    expander: &Arc<X>,
    branching_factor: usize,
    policy: CallPolicy,
) -> Result<ExpansionReport>
where
    S: Clone + Send + 'static,
    X: Expander<S>,
{
    let node = tree.try_get(node_id)?;
    let segment = node.segment().clone();
    let depth = node.depth();

    let (candidates, retries) =
        request_candidates(expander, &segment, depth, branching_factor, policy);

    let outcome = match candidates {
        Ok(candidates) if candidates.is_empty() => {
            debug!(node = %node_id, "no candidates, marking terminal");
            tree.mark_terminal(node_id);
            ExpansionOutcome::Exhausted
        }
        Ok(candidates) => {
            let mut children = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                children.push(tree.add_child(node_id, candidate)?);
            }
            debug!(node = %node_id, children = children.len(), "expanded");
            ExpansionOutcome::Expanded(children)
        }
        Err(ExpansionError::Interrupted) => {
            debug!(node = %node_id, "expansion interrupted by deadline");
            ExpansionOutcome::Interrupted
        }
        Err(err) => {
            warn!(node = %node_id, error = %err, "expansion failed, pruning node");
            tree.mark_pruned(node_id);
            ExpansionOutcome::Failed(err)
        }
    };

    Ok(ExpansionReport { outcome, retries })
}

/// Ask the expander for candidates under the call policy
///
/// Oversized answers are cut down to `max_candidates`.
fn request_candidates<S, X>(
    expander: &Arc<X>,
    segment: &S,
    depth: usize,
    max_candidates: usize,
    policy: CallPolicy,
) -> (std::result::Result<Vec<S>, ExpansionError>, u32)
where
    S: Clone + Send + 'static,
    X: Expander<S>,
{
    let (result, retries) = with_retries(policy, "expand", |timeout| {
        let expander = Arc::clone(expander);
        let segment = segment.clone();
        call_with_deadline(timeout, move || {
            expander.expand(&segment, depth, max_candidates)
        })
        .unwrap_or_else(|failure| Err(failure.into()))
    });

    let result = result.map(|mut candidates| {
        if candidates.len() > max_candidates {
            warn!(
                returned = candidates.len(),
                max_candidates, "expander exceeded branching factor, truncating"
            );
            candidates.truncate(max_candidates);
        }
        candidates
    });

    (result, retries)
}
