use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// Identifier of a control-flow node. Stable across splicing: nodes are added,
/// never removed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

/// Identifier of a function owning a region of the graph.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FunctionId(pub u32);

pub type EdgeId = EdgeIndex;

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Loop structure for one natural (or recursive) loop, as delivered by the
/// CFG-construction collaborator: the header node plus body membership.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub header: NodeId,
    pub body: HashSet<NodeId>,
    /// Loop arising from self/mutual recursion rather than a back edge.
    pub recursive: bool,
    /// Bit width of the loop's controlling variable, when the collaborator
    /// could determine one. Drives the candidate domain for parameterized
    /// under-approximating summaries.
    pub bound_width: Option<u32>,
}

impl LoopInfo {
    pub fn new(header: NodeId, body: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            header,
            body: body.into_iter().collect(),
            recursive: false,
            bound_width: None,
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn with_bound_width(mut self, width: u32) -> Self {
        self.bound_width = Some(width);
        self
    }
}

/// The host control-flow graph this crate rewrites.
///
/// A `DiGraph` plus a side table mapping node ids to graph indices, with
/// function ownership and loop structure carried alongside. Ghost regions get
/// their node ids from [`reserve_node`](ControlFlowGraph::reserve_node) so a
/// summary can name fresh nodes before they are spliced into the graph.
#[derive(Debug, Default)]
pub struct ControlFlowGraph {
    graph: DiGraph<NodeId, ()>,
    indices: HashMap<NodeId, NodeIndex>,
    owners: HashMap<NodeId, FunctionId>,
    entries: BTreeMap<FunctionId, NodeId>,
    loops: BTreeMap<NodeId, LoopInfo>,
    next_node: u32,
    next_function: u32,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self) -> FunctionId {
        let f = FunctionId(self.next_function);
        self.next_function += 1;
        f
    }

    /// Allocate a fresh node and insert it into the graph.
    pub fn add_node(&mut self, function: FunctionId) -> NodeId {
        let node = self.reserve_node(function);
        self.insert(node);
        node
    }

    /// Allocate a fresh node id owned by `function` without inserting it into
    /// the graph. The node joins the graph on [`insert`](Self::insert) or the
    /// first edge that mentions it.
    pub fn reserve_node(&mut self, function: FunctionId) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.owners.insert(node, function);
        node
    }

    /// Insert a previously reserved node into the graph. Idempotent.
    pub fn insert(&mut self, node: NodeId) {
        if !self.indices.contains_key(&node) {
            let idx = self.graph.add_node(node);
            self.indices.insert(node, idx);
        }
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> EdgeId {
        self.insert(from);
        self.insert(to);
        let from_idx = self.indices[&from];
        let to_idx = self.indices[&to];
        self.graph.add_edge(from_idx, to_idx, ())
    }

    pub fn set_entry(&mut self, function: FunctionId, node: NodeId) {
        self.entries.insert(function, node);
    }

    pub fn entry_of(&self, function: FunctionId) -> Option<NodeId> {
        self.entries.get(&function).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.values().copied()
    }

    pub fn set_loop(&mut self, info: LoopInfo) {
        self.loops.insert(info.header, info);
    }

    pub fn loop_at(&self, header: NodeId) -> Option<&LoopInfo> {
        self.loops.get(&header)
    }

    pub fn loops(&self) -> impl Iterator<Item = &LoopInfo> {
        self.loops.values()
    }

    pub fn owner_of(&self, node: NodeId) -> Option<FunctionId> {
        self.owners.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.indices.contains_key(&node)
    }

    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        match self.indices.get(&node) {
            Some(idx) => self
                .graph
                .neighbors_directed(*idx, Direction::Outgoing)
                .map(|i| self.graph[i])
                .collect(),
            None => vec![],
        }
    }

    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        match self.indices.get(&node) {
            Some(idx) => self
                .graph
                .neighbors_directed(*idx, Direction::Incoming)
                .map(|i| self.graph[i])
                .collect(),
            None => vec![],
        }
    }

    pub fn leaving_edges(&self, node: NodeId) -> Vec<EdgeId> {
        use petgraph::visit::EdgeRef;
        match self.indices.get(&node) {
            Some(idx) => self
                .graph
                .edges_directed(*idx, Direction::Outgoing)
                .map(|e| e.id())
                .collect(),
            None => vec![],
        }
    }

    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph
            .edge_endpoints(edge)
            .map(|(a, b)| (self.graph[a], self.graph[b]))
    }

    pub fn edge_target(&self, edge: EdgeId) -> Option<NodeId> {
        self.edge_endpoints(edge).map(|(_, to)| to)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
