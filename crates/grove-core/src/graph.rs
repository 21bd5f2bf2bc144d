//! Storage for file and symbol nodes over `petgraph::StableDiGraph`

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::model::*;

/// Directed multigraph of files and symbols.
///
/// `NodeId`s and `EdgeId`s come from counters that only grow and are never
/// handed out twice. Petgraph indices stay private.
#[derive(Default)]
pub struct Graph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    nodes: HashMap<NodeId, NodeIndex>,
    edges: HashMap<EdgeId, EdgeIndex>,
    edge_ids: HashMap<EdgeIndex, EdgeId>,
    next_node: u64,
    next_edge: u64,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.inner.node_count())
            .field("edges", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let idx = self.inner.add_node(node);
        self.nodes.insert(id, idx);
        id
    }

    /// Link two live nodes. Returns `None` if either endpoint is gone.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Option<EdgeId> {
        let source = *self.nodes.get(&edge.source)?;
        let target = *self.nodes.get(&edge.target)?;
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        let idx = self.inner.add_edge(source, target, edge);
        self.edges.insert(id, idx);
        self.edge_ids.insert(idx, id);
        Some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.inner.node_weight(*self.nodes.get(&id)?)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.inner.node_weight_mut(*self.nodes.get(&id)?)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.inner.edge_weight(*self.edges.get(&id)?)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    fn edges(&self, id: NodeId, direction: Direction) -> impl Iterator<Item = (EdgeId, &GraphEdge)> {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(move |idx| self.inner.edges_directed(*idx, direction))
            .filter_map(move |e| Some((*self.edge_ids.get(&e.id())?, e.weight())))
    }

    pub fn edges_from(&self, source: NodeId) -> impl Iterator<Item = (EdgeId, &GraphEdge)> {
        self.edges(source, Direction::Outgoing)
    }

    pub fn edges_to(&self, target: NodeId) -> impl Iterator<Item = (EdgeId, &GraphEdge)> {
        self.edges(target, Direction::Incoming)
    }

    pub fn has_edge_between(&self, source: NodeId, target: NodeId, kind: EdgeKind) -> bool {
        self.edges_from(source).any(|(_, e)| e.target == target && e.kind == kind)
    }

    /// Remove a node together with its edges.
    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let idx = self.nodes.remove(&id)?;
        let attached: Vec<EdgeIndex> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.inner.edges_directed(idx, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        for edge in attached {
            if let Some(eid) = self.edge_ids.remove(&edge) {
                self.edges.remove(&eid);
            }
        }
        self.inner.remove_node(idx)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<GraphEdge> {
        let idx = self.edges.remove(&id)?;
        self.edge_ids.remove(&idx);
        self.inner.remove_edge(idx)
    }

    /// Every node that defines `node`, directly or through a chain of
    /// `Defines` edges: enclosing symbols and finally the file.
    pub fn definers(&self, node: NodeId) -> HashSet<NodeId> {
        let mut found = HashSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            for (_, edge) in self.edges_to(current) {
                if edge.kind == EdgeKind::Defines && found.insert(edge.source) {
                    stack.push(edge.source);
                }
            }
        }
        found
    }
}
