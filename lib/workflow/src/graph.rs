//! Workflow graph implementation using petgraph.
//!
//! Workflows are directed graphs where:
//! - Nodes are triggers, conditions and actions
//! - Edges carry flow from one node to the next, optionally labeled
//!
//! A stable graph keeps indices valid across removals, so the id-to-index
//! maps never need rebuilding after a delete.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use pathway_core::{EdgeId, NodeId};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences, Walker};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Nodes and edges of one workflow.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    graph: StableDiGraph<Node, Edge>,
    node_index_map: HashMap<NodeId, NodeIndex>,
    edge_index_map: HashMap<EdgeId, EdgeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph.
    ///
    /// Returns the node ID.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let node_id = node.id;
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        node_id
    }

    /// Removes a node and every edge touching it.
    ///
    /// Returns the node and the removed edges.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<(Node, Vec<Edge>)> {
        let index = self.node_index_map.remove(&node_id)?;
        let incident: Vec<EdgeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|edge| edge.id())
            .collect();

        let mut removed = Vec::with_capacity(incident.len());
        for edge_index in incident {
            if let Some(edge) = self.graph.remove_edge(edge_index) {
                self.edge_index_map.remove(&edge.id);
                removed.push(edge);
            }
        }

        let node = self.graph.remove_node(index)?;
        Some((node, removed))
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Returns true if the node exists.
    #[must_use]
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index_map.contains_key(&node_id)
    }

    /// Inserts an edge between two existing nodes.
    ///
    /// Only endpoint existence is checked here; structural rules belong to
    /// the validation module.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if either endpoint is missing.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let source = *self
            .node_index_map
            .get(&edge.from)
            .ok_or(GraphError::NodeNotFound { node_id: edge.from })?;
        let target = *self
            .node_index_map
            .get(&edge.to)
            .ok_or(GraphError::NodeNotFound { node_id: edge.to })?;

        let edge_id = edge.id;
        let index = self.graph.add_edge(source, target, edge);
        self.edge_index_map.insert(edge_id, index);
        Ok(edge_id)
    }

    /// Removes an edge by its ID.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        let index = self.edge_index_map.remove(&edge_id)?;
        self.graph.remove_edge(index)
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        let index = self.edge_index_map.get(&edge_id)?;
        self.graph.edge_weight(*index)
    }

    /// Returns true if the edge exists.
    #[must_use]
    pub fn contains_edge(&self, edge_id: EdgeId) -> bool {
        self.edge_index_map.contains_key(&edge_id)
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(|index| &self.graph[index])
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_references().map(|edge| edge.weight())
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the number of Trigger nodes.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.nodes()
            .filter(|node| node.kind() == NodeKind::Trigger)
            .count()
    }

    /// Returns the edges leaving a node.
    pub fn outgoing(&self, node_id: NodeId) -> Vec<&Edge> {
        self.edges_directed(node_id, Direction::Outgoing)
    }

    fn edges_directed(&self, node_id: NodeId, direction: Direction) -> Vec<&Edge> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, direction)
            .map(|edge| edge.weight())
            .collect()
    }

    /// Returns true if `to` can be reached from `from` along directed edges.
    ///
    /// A node always reaches itself.
    #[must_use]
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        let (Some(&source), Some(&target)) =
            (self.node_index_map.get(&from), self.node_index_map.get(&to))
        else {
            return false;
        };
        petgraph::algo::has_path_connecting(&self.graph, source, target, None)
    }

    /// Returns the IDs of every node reachable from some Trigger, triggers included.
    #[must_use]
    pub fn reachable_from_triggers(&self) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        for index in self.graph.node_indices() {
            if self.graph[index].kind() != NodeKind::Trigger {
                continue;
            }
            for visited in Dfs::new(&self.graph, index).iter(&self.graph) {
                reachable.insert(self.graph[visited].id);
            }
        }
        reachable
    }

    /// Returns true if the graph contains a directed cycle.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}

impl PartialEq for WorkflowGraph {
    /// Graphs are equal when they hold the same nodes and edges, regardless
    /// of internal index layout.
    fn eq(&self, other: &Self) -> bool {
        let nodes = |g: &Self| g.nodes().map(|n| (n.id, n.clone())).collect::<BTreeMap<_, _>>();
        let edges = |g: &Self| g.edges().map(|e| (e.id, e.clone())).collect::<BTreeMap<_, _>>();
        nodes(self) == nodes(other) && edges(self) == edges(other)
    }
}
