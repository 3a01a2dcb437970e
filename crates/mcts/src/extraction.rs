use std::cmp::Ordering;

use crate::error::Result;
use crate::tree::{NodeId, SearchTree};

/// Highest-value route found in a tree
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    /// Node ids from the root's first child down to the final node
    pub nodes: Vec<NodeId>,

    /// Average value of the final node (0.0 when the route is root-only or unvisited)
    pub score: f32,
}

impl BestPath {
    /// Final node of the route, `None` when the route never left the root
    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Segments along the route, root excluded
    pub fn segments<'a, S>(&self, tree: &'a SearchTree<S>) -> Vec<&'a S> {
        self.nodes.iter().map(|&id| tree.get(id).segment()).collect()
    }
}

/// Walk the tree greedily along the best non-pruned children
///
/// At each step the child with the highest average value wins, ties going to
/// the higher visit count and then the lower id. The walk stops at a terminal
/// node or at one without non-pruned children.
pub fn best_path<S>(tree: &SearchTree<S>) -> BestPath {
    let mut nodes = Vec::new();
    let mut current_id = tree.root_id();

    loop {
        let node = tree.get(current_id);
        if node.is_terminal() && current_id != tree.root_id() {
            break;
        }

        let next = node
            .children()
            .iter()
            .copied()
            .filter(|&c| !tree.get(c).is_pruned())
            .max_by(|&a, &b| compare_candidates(tree, a, b));

        match next {
            Some(child_id) => {
                nodes.push(child_id);
                current_id = child_id;
            }
            None => break,
        }
    }

    let score = nodes
        .last()
        .and_then(|&id| tree.get(id).average_value())
        .unwrap_or(0.0);

    BestPath { nodes, score }
}

/// Route from the root down to `node_id`, scored by that node's average value
pub fn path_to_node<S>(tree: &SearchTree<S>, node_id: NodeId) -> Result<BestPath> {
    let mut nodes = tree.ancestry(node_id)?;
    nodes.pop();
    nodes.reverse();

    let score = tree.get(node_id).average_value().unwrap_or(0.0);
    Ok(BestPath { nodes, score })
}

/// Ordering where the preferred child compares greatest
fn compare_candidates<S>(tree: &SearchTree<S>, a: NodeId, b: NodeId) -> Ordering {
    let (na, nb) = (tree.get(a), tree.get(b));

    // Unvisited (`None`) sorts below any visited value
    let by_value = match (na.average_value(), nb.average_value()) {
        (Some(va), Some(vb)) => va.partial_cmp(&vb).unwrap_or(Ordering::Equal),
        (va, vb) => va.is_some().cmp(&vb.is_some()),
    };

    by_value
        .then_with(|| na.visit_count().cmp(&nb.visit_count()))
        .then_with(|| b.cmp(&a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup;

    #[test]
    fn test_root_only_tree() {
        let tree = SearchTree::new("task");
        let best = best_path(&tree);
        assert!(best.nodes.is_empty());
        assert_eq!(best.score, 0.0);
        assert_eq!(best.last(), None);
    }

    #[test]
    fn test_follows_highest_average() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        let b = tree.add_child(NodeId::ROOT, "b").unwrap();
        let b1 = tree.add_child(b, "b1").unwrap();
        let b2 = tree.add_child(b, "b2").unwrap();
        backup(&mut tree, a, 0.4).unwrap();
        backup(&mut tree, b, 0.7).unwrap();
        backup(&mut tree, b1, 0.6).unwrap();
        backup(&mut tree, b2, 0.9).unwrap();

        let best = best_path(&tree);

        assert_eq!(best.nodes, vec![b, b2]);
        assert_eq!(best.segments(&tree), vec![&"b", &"b2"]);
        assert!((best.score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_ties_prefer_visits_then_lowest_id() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        let b = tree.add_child(NodeId::ROOT, "b").unwrap();
        let c = tree.add_child(NodeId::ROOT, "c").unwrap();
        backup(&mut tree, a, 0.5).unwrap();
        backup(&mut tree, b, 0.5).unwrap();
        backup(&mut tree, c, 0.5).unwrap();
        assert_eq!(best_path(&tree).nodes, vec![a]);

        backup(&mut tree, c, 0.5).unwrap();
        assert_eq!(best_path(&tree).nodes, vec![c]);
    }

    #[test]
    fn test_skips_pruned_children() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        let b = tree.add_child(NodeId::ROOT, "b").unwrap();
        backup(&mut tree, a, 1.0).unwrap();
        backup(&mut tree, b, 0.2).unwrap();
        tree.mark_pruned(a);

        assert_eq!(best_path(&tree).nodes, vec![b]);
    }

    #[test]
    fn test_stops_at_terminal() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        let a1 = tree.add_child(a, "a1").unwrap();
        backup(&mut tree, a1, 0.8).unwrap();
        tree.mark_terminal(a);

        let best = best_path(&tree);
        assert_eq!(best.nodes, vec![a]);
        assert!((best.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_all_children_pruned() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        backup(&mut tree, a, 0.0).unwrap();
        tree.mark_pruned(a);

        let best = best_path(&tree);
        assert!(best.nodes.is_empty());
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_path_to_node_ignores_better_branches() {
        let mut tree = SearchTree::new("task");
        let a = tree.add_child(NodeId::ROOT, "a").unwrap();
        let b = tree.add_child(NodeId::ROOT, "b").unwrap();
        let a1 = tree.add_child(a, "a1").unwrap();
        backup(&mut tree, a, 0.2).unwrap();
        backup(&mut tree, b, 0.7).unwrap();
        backup(&mut tree, a1, 0.95).unwrap();

        let route = path_to_node(&tree, a1).unwrap();

        assert_eq!(route.nodes, vec![a, a1]);
        assert!((route.score - 0.95).abs() < 1e-6);
        assert_eq!(best_path(&tree).nodes, vec![b]);
        assert!(path_to_node(&tree, NodeId(9)).is_err());
    }
}
