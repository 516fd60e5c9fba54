use crate::cfg::NodeId;
use crate::summary::registry::GhostId;
use std::collections::BTreeSet;

/// Identifier of a search-tree node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ArgNodeId(pub usize);

/// Per-location refinement state: the summary currently applied at this
/// location and the summaries refinement has ruled out. The forbidden set
/// only ever grows for a given location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPrecision {
    pub current: Option<GhostId>,
    pub forbidden: BTreeSet<GhostId>,
}

impl LocationPrecision {
    pub fn with_current(ghost: GhostId) -> Self {
        Self {
            current: Some(ghost),
            ..Default::default()
        }
    }
}

/// A node of the reachability tree built by the external exploration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgNode {
    pub parent: Option<ArgNodeId>,
    children: Vec<ArgNodeId>,
    pub location: NodeId,
    pub precision: LocationPrecision,
    pub target: bool,
}

impl ArgNode {
    pub fn children(&self) -> &[ArgNodeId] {
        &self.children
    }
}

/// The exploration engine's tree of visited abstract states (ARG). This core
/// never creates states of its own; it only reads precisions, mutates them
/// during refinement, and prunes stale subtrees.
#[derive(Debug, Default)]
pub struct SearchTree {
    nodes: Vec<Option<ArgNode>>,
}

impl SearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: ArgNode) -> ArgNodeId {
        let id = ArgNodeId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    pub fn add_root(&mut self, location: NodeId) -> ArgNodeId {
        self.push(ArgNode {
            parent: None,
            children: vec![],
            location,
            precision: LocationPrecision::default(),
            target: false,
        })
    }

    pub fn add_child(&mut self, parent: ArgNodeId, location: NodeId) -> Option<ArgNodeId> {
        if self.node(parent).is_none() {
            return None;
        }
        let id = self.push(ArgNode {
            parent: Some(parent),
            children: vec![],
            location,
            precision: LocationPrecision::default(),
            target: false,
        });
        if let Some(Some(p)) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        Some(id)
    }

    pub fn node(&self, id: ArgNodeId) -> Option<&ArgNode> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, id: ArgNodeId) -> Option<&mut ArgNode> {
        self.nodes.get_mut(id.0).and_then(|n| n.as_mut())
    }

    pub fn precision(&self, id: ArgNodeId) -> Option<&LocationPrecision> {
        self.node(id).map(|n| &n.precision)
    }

    pub fn precision_mut(&mut self, id: ArgNodeId) -> Option<&mut LocationPrecision> {
        self.node_mut(id).map(|n| &mut n.precision)
    }

    pub fn mark_target(&mut self, id: ArgNodeId) {
        if let Some(n) = self.node_mut(id) {
            n.target = true;
        }
    }

    /// The node refinement starts from: the most recently added target node,
    /// falling back to the last node in the tree.
    pub fn refinement_root(&self) -> Option<ArgNodeId> {
        self.iter()
            .filter(|(_, n)| n.target)
            .map(|(id, _)| id)
            .next_back()
            .or_else(|| self.iter().map(|(id, _)| id).next_back())
    }

    pub fn contains(&self, id: ArgNodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (ArgNodeId, &ArgNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (ArgNodeId(i), n)))
    }

    /// Every live descendant of `id`, not including `id` itself.
    pub fn descendants(&self, id: ArgNodeId) -> Vec<ArgNodeId> {
        let mut out = vec![];
        let mut stack: Vec<ArgNodeId> = self
            .node(id)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if let Some(n) = self.node(next) {
                stack.extend(n.children.iter().copied());
                out.push(next);
            }
        }
        out
    }

    /// Prune every descendant of `id` but keep the node itself. Refinement
    /// uses this after mutating the node's own precision, which removing the
    /// node would discard.
    pub fn remove_children(&mut self, id: ArgNodeId) {
        for d in self.descendants(id) {
            self.nodes[d.0] = None;
        }
        if let Some(n) = self.node_mut(id) {
            n.children.clear();
        }
    }

    /// Remove `id` and its whole subtree, detaching it from its parent.
    pub fn remove_subtree(&mut self, id: ArgNodeId) {
        if !self.contains(id) {
            return;
        }
        let parent = self.node(id).and_then(|n| n.parent);
        for d in self.descendants(id) {
            self.nodes[d.0] = None;
        }
        self.nodes[id.0] = None;
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.retain(|c| *c != id);
        }
    }
}
