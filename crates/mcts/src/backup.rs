use crate::error::{Result, SearchError};
use crate::tree::{NodeId, SearchTree};

/// Backup a score from `node_id` to the root
///
/// Every node on the chain, `node_id` included, gets one more visit and
/// `score` added to its value sum. The chain is resolved before anything is
/// written, so a broken parent link fails the call without leaving a
/// half-applied update behind. Scores outside [0, 1] (NaN included) are
/// rejected the same way.
pub fn backup<S>(tree: &mut SearchTree<S>, node_id: NodeId, score: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&score) {
        return Err(SearchError::InvariantViolation(format!(
            "score {score} backed up from {node_id} is outside [0, 1]"
        )));
    }

    let chain = tree.ancestry(node_id)?;
    for id in chain {
        tree.get_mut(id).stats.record(score);
    }
    Ok(())
}
