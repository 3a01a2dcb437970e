use std::fmt;

use crate::error::{Result, SearchError};

/// Slack allowed when checking average values against [0, 1]
const STATS_TOLERANCE: f32 = 1e-4;

/// Handle of a node in the arena-style tree
///
/// Ids are arena indices, handed out in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root is always the first node allocated
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Visit/value statistics accumulated by backpropagation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    /// Completed backpropagations that passed through this node
    pub visit_count: u32,

    /// Sum of the scores carried by those backpropagations
    pub value_sum: f32,
}

impl NodeStats {
    /// Mean backpropagated score, `None` while unvisited
    pub fn average_value(&self) -> Option<f32> {
        if self.visit_count == 0 {
            None
        } else {
            Some(self.value_sum / self.visit_count as f32)
        }
    }

    pub(crate) fn record(&mut self, score: f32) {
        self.visit_count += 1;
        self.value_sum += score;
    }
}

/// A single vertex of the search tree
#[derive(Debug, Clone)]
pub struct SearchNode<S> {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) segment: S,
    pub(crate) depth: usize,
    pub(crate) stats: NodeStats,
    pub(crate) terminal: bool,
    pub(crate) pruned: bool,
}

impl<S> SearchNode<S> {
    fn new(id: NodeId, parent: Option<NodeId>, segment: S, depth: usize) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            segment,
            depth,
            stats: NodeStats::default(),
            terminal: false,
            pruned: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent handle (weak back-reference, `None` for the root)
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in creation order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The step this node represents
    pub fn segment(&self) -> &S {
        &self.segment
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn visit_count(&self) -> u32 {
        self.stats.visit_count
    }

    pub fn value_sum(&self) -> f32 {
        self.stats.value_sum
    }

    pub fn average_value(&self) -> Option<f32> {
        self.stats.average_value()
    }

    /// Complete solution, depth-capped, or out of moves
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Expansion or evaluation failed for good
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    /// Still eligible for selection
    pub fn is_open(&self) -> bool {
        !self.terminal && !self.pruned
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Search tree using arena allocation
///
/// Nodes are never removed and child lists only grow, so every `NodeId`
/// handed out stays valid for the lifetime of the tree.
#[derive(Debug, Clone)]
pub struct SearchTree<S> {
    nodes: Vec<SearchNode<S>>,
}

impl<S> SearchTree<S> {
    /// Create a tree holding only a root for `task`
    pub fn new(task: S) -> Self {
        Self {
            nodes: vec![SearchNode::new(NodeId::ROOT, None, task, 0)],
        }
    }

    pub fn root_id(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root(&self) -> &SearchNode<S> {
        &self.nodes[0]
    }

    /// Get a node by ID
    ///
    /// # Panics
    /// Panics if the id does not belong to this tree.
    pub fn get(&self, id: NodeId) -> &SearchNode<S> {
        &self.nodes[id.0]
    }

    /// Fallible lookup for ids of unknown origin
    pub fn try_get(&self, id: NodeId) -> Result<&SearchNode<S>> {
        self.nodes.get(id.0).ok_or(SearchError::InvalidNodeId(id.0))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut SearchNode<S> {
        &mut self.nodes[id.0]
    }

    /// Append a child under `parent` and return its ID
    pub fn add_child(&mut self, parent: NodeId, segment: S) -> Result<NodeId> {
        let depth = self.try_get(parent)?.depth + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(SearchNode::new(id, Some(parent), segment, depth));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Close a node: it has no further moves or is finished
    ///
    /// # Panics
    /// Panics if the id does not belong to this tree.
    pub fn mark_terminal(&mut self, id: NodeId) {
        self.nodes[id.0].terminal = true;
    }

    /// Close a node as a dead end
    ///
    /// # Panics
    /// Panics if the id does not belong to this tree.
    pub fn mark_pruned(&mut self, id: NodeId) {
        self.nodes[id.0].pruned = true;
    }

    /// Get the number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &SearchNode<S>> {
        self.nodes.iter()
    }

    /// Node ids from `id` up to and including the root
    ///
    /// Fails with `InvariantViolation` if the parent links loop.
    pub fn ancestry(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.try_get(id)?;

        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if chain.len() >= self.nodes.len() {
                return Err(SearchError::InvariantViolation(format!(
                    "parent chain from {id} does not reach the root"
                )));
            }
            chain.push(node_id);
            current = self.try_get(node_id)?.parent;
        }
        Ok(chain)
    }

    /// Segments along the route root -> `id`, root excluded
    pub fn path_to(&self, id: NodeId) -> Result<Vec<&S>> {
        let mut chain = self.ancestry(id)?;
        chain.pop();
        chain.reverse();
        Ok(chain.into_iter().map(|n| &self.nodes[n.0].segment).collect())
    }

    /// Check the structural and statistical invariants of the whole tree
    pub fn validate(&self) -> Result<()> {
        let root = self.root();
        if root.parent.is_some() || root.depth != 0 {
            return Err(violation("root must have no parent and depth 0".into()));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.0 != index {
                return Err(violation(format!(
                    "node at slot {index} carries id {}",
                    node.id
                )));
            }

            if index > 0 {
                let parent_id = node
                    .parent
                    .ok_or_else(|| violation(format!("{} has no parent", node.id)))?;
                // Parents are always allocated before their children
                if parent_id.0 >= index {
                    return Err(violation(format!(
                        "{} points at later node {parent_id} as parent",
                        node.id
                    )));
                }
                let parent = &self.nodes[parent_id.0];
                if node.depth != parent.depth + 1 {
                    return Err(violation(format!(
                        "{} has depth {} under parent depth {}",
                        node.id, node.depth, parent.depth
                    )));
                }
                let listed = parent.children.iter().filter(|&&c| c == node.id).count();
                if listed != 1 {
                    return Err(violation(format!(
                        "{} listed {listed} times by parent {parent_id}",
                        node.id
                    )));
                }
            }

            for &child in &node.children {
                let child_parent = self.try_get(child)?.parent;
                if child_parent != Some(node.id) {
                    return Err(violation(format!(
                        "{child} listed by {} but its parent is {child_parent:?}",
                        node.id
                    )));
                }
            }

            match node.stats.average_value() {
                None if node.stats.value_sum != 0.0 => {
                    return Err(violation(format!(
                        "{} is unvisited but has value sum {}",
                        node.id, node.stats.value_sum
                    )));
                }
                Some(avg) if !(-STATS_TOLERANCE..=1.0 + STATS_TOLERANCE).contains(&avg) => {
                    return Err(violation(format!(
                        "{} has average value {avg} outside [0, 1]",
                        node.id
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn violation(msg: String) -> SearchError {
    SearchError::InvariantViolation(msg)
}
