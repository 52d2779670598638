//! Workflow definition types.
//!
//! A workflow is a named, versioned automation that consists of:
//! - Metadata (name, enabled flag, persisted version)
//! - A directed graph of nodes
//!
//! `WorkflowDefinition` is the durable form exchanged with storage and the
//! execution engine. Conversion from a definition rejects any internally
//! inconsistent record instead of dropping parts of it.

use crate::edge::Edge;
use crate::error::CorruptReason;
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeConfig, NodeKind, NodeType, Position};
use pathway_core::{EdgeId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

/// Record fields not understood by this editor.
///
/// Written back untouched so definitions from newer editors round-trip.
pub type ExtraFields = Map<String, JsonValue>;

/// The live workflow of an editing session.
///
/// Fields are only mutated through [`GraphStore`](crate::store::GraphStore).
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub(crate) id: WorkflowId,
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) version: u64,
    pub(crate) revision: u64,
    pub(crate) dirty: bool,
    pub(crate) graph: WorkflowGraph,
    /// Identifies the current content; equal stamps mean equal content.
    pub(crate) stamp: u64,
    pub(crate) extra: ExtraFields,
}

impl Workflow {
    /// Creates an empty, never-saved workflow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(WorkflowId::new(), name)
    }

    /// Creates an empty workflow with a specific ID.
    #[must_use]
    pub fn with_id(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            version: 0,
            revision: 0,
            dirty: true,
            graph: WorkflowGraph::new(),
            stamp: 0,
            extra: ExtraFields::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Version of the last persisted definition (0 if never saved).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// In-memory mutation counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True if the workflow has changes not reflected in the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Returns true if both workflows hold the same nodes, edges and metadata.
    ///
    /// Session bookkeeping (revision, dirty flag) is ignored.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.enabled == other.enabled
            && self.graph == other.graph
            && self.extra == other.extra
    }

    /// Serializes this workflow into its durable form.
    #[must_use]
    pub fn to_definition(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id,
            name: self.name.clone(),
            enabled: self.enabled,
            version: self.version,
            nodes: self.graph.nodes().map(NodeRecord::from).collect(),
            edges: self.graph.edges().map(EdgeRecord::from).collect(),
            extra: self.extra.clone(),
        }
    }
}

/// Durable workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub enabled: bool,
    pub version: u64,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Durable form of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub subtype: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            kind: node.kind(),
            subtype: node.node_type.subtype().to_string(),
            position: node.position,
            config: node.stored_config().cloned(),
            extra: node.extra.clone(),
        }
    }
}

/// Durable form of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id,
            from: edge.from,
            to: edge.to,
            label: edge.label.clone(),
            extra: edge.extra.clone(),
        }
    }
}

impl WorkflowDefinition {
    /// Builds a fresh workflow from this definition.
    ///
    /// The result is clean (not dirty) at revision 0. Structural legality
    /// (cycles, action sources) is left to graph validation; only internal
    /// consistency is checked here.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found: unknown subtype, kind/subtype
    /// mismatch, duplicate node or edge id, or an edge endpoint that is not
    /// among the nodes.
    pub fn into_workflow(self) -> Result<Workflow, CorruptReason> {
        let mut graph = WorkflowGraph::new();

        for record in self.nodes {
            let node_type: NodeType =
                record
                    .subtype
                    .parse()
                    .map_err(|_| CorruptReason::UnknownSubtype {
                        node: record.id.to_string(),
                        subtype: record.subtype.clone(),
                    })?;
            if node_type.kind() != record.kind {
                return Err(CorruptReason::KindMismatch {
                    node: record.id.to_string(),
                    kind: record.kind.to_string(),
                    subtype: record.subtype,
                });
            }
            if graph.contains_node(record.id) {
                return Err(CorruptReason::DuplicateNode {
                    node: record.id.to_string(),
                });
            }
            let mut node = match record.config {
                Some(config) => Node::with_id(record.id, node_type, record.position, config),
                None => Node::with_id(record.id, node_type, record.position, NodeConfig::new())
                    .without_stored_config(),
            };
            node.extra = record.extra;
            graph.add_node(node);
        }

        let mut seen_edges = HashSet::new();
        for record in self.edges {
            if !seen_edges.insert(record.id) {
                return Err(CorruptReason::DuplicateEdge {
                    edge: record.id.to_string(),
                });
            }
            let edge_id = record.id;
            let mut edge = Edge::with_id(record.id, record.from, record.to, record.label);
            edge.extra = record.extra;
            graph
                .insert_edge(edge)
                .map_err(|_| {
                    let endpoint = if graph.contains_node(record.from) {
                        record.to
                    } else {
                        record.from
                    };
                    CorruptReason::DanglingEndpoint {
                        edge: edge_id.to_string(),
                        endpoint: endpoint.to_string(),
                    }
                })?;
        }

        Ok(Workflow {
            id: self.id,
            name: self.name,
            enabled: self.enabled,
            version: self.version,
            revision: 0,
            dirty: false,
            graph,
            stamp: 0,
            extra: self.extra,
        })
    }
}
