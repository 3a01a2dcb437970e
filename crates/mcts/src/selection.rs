use tracing::trace;

use crate::tree::{NodeId, SearchTree};

/// Keeps the UCT exploration term finite for barely visited children
const VISIT_EPSILON: f32 = 1e-6;

/// Select the next frontier node to expand using UCT
///
/// Descends from the root, always taking the open child with the highest
/// UCT value, until it reaches an open node without children. A node whose
/// children are all closed gets closed itself and the descent resumes from
/// its parent. Returns `None` once the root is closed.
pub fn select<S>(tree: &mut SearchTree<S>, exploration_constant: f32) -> Option<NodeId> {
    let mut current_id = tree.root_id();

    loop {
        let node = tree.get(current_id);

        if !node.is_open() {
            // Only the root can be reached while closed
            current_id = node.parent()?;
            continue;
        }

        if node.is_leaf() {
            return Some(current_id);
        }

        match best_child(tree, current_id, exploration_constant) {
            Some(child_id) => current_id = child_id,
            None => {
                close_exhausted(tree, current_id);
                current_id = tree.get(current_id).parent()?;
            }
        }
    }
}

/// Open child with the highest UCT value, ties going to the lowest id
fn best_child<S>(tree: &SearchTree<S>, node_id: NodeId, c: f32) -> Option<NodeId> {
    let node = tree.get(node_id);
    let parent_visits = node.visit_count();

    let mut best: Option<(NodeId, f32)> = None;
    for &child_id in node.children() {
        if !tree.get(child_id).is_open() {
            continue;
        }
        let value = uct_value(tree, child_id, parent_visits, c);
        best = match best {
            Some((best_id, best_value))
                if best_value > value || (best_value == value && best_id < child_id) =>
            {
                Some((best_id, best_value))
            }
            _ => Some((child_id, value)),
        };
    }

    best.map(|(id, _)| id)
}

/// Close a node whose children have all been closed
///
/// If every child was pruned the branch is a dead end and gets pruned too;
/// otherwise at least one child finished and the node counts as terminal.
fn close_exhausted<S>(tree: &mut SearchTree<S>, node_id: NodeId) {
    let all_pruned = tree
        .get(node_id)
        .children()
        .iter()
        .all(|&c| tree.get(c).is_pruned());

    trace!(node = %node_id, all_pruned, "closing exhausted node");
    if all_pruned {
        tree.mark_pruned(node_id);
    } else {
        tree.mark_terminal(node_id);
    }
}

/// Calculate UCT value for a node
///
/// UCT(child) = Q(child) + c * sqrt(ln(N(parent) + 1) / (N(child) + ε))
///
/// Where:
/// - Q(child) is the average backpropagated score
/// - N(parent), N(child) are visit counts
/// - c is the exploration constant
///
/// Unvisited children are infinitely attractive.
pub fn uct_value<S>(tree: &SearchTree<S>, node_id: NodeId, parent_visits: u32, c: f32) -> f32 {
    let node = tree.get(node_id);

    let Some(q) = node.average_value() else {
        return f32::INFINITY;
    };

    let n = node.visit_count() as f32;
    let u = c * (((parent_visits as f32) + 1.0).ln() / (n + VISIT_EPSILON)).sqrt();

    q + u
}
