//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: Rejected graph mutations (missing ids, illegal edges, broken invariants)
//! - `PersistenceError`: Save/load failures
//! - `TransportError`: Backend I/O failures, distinct from the domain taxonomy
//!
//! All of these are recoverable at the editing-session level.

use crate::validation::Finding;
use pathway_core::{EdgeId, NodeId, WorkflowId};
use std::fmt;

/// Why a proposed edge was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeRejection {
    /// Source and target are the same node.
    SelfLoop,
    /// Action nodes never have outgoing edges.
    SourceIsAction,
    /// An edge with the same source, target and label already exists.
    Duplicate,
    /// The edge would close a directed cycle.
    WouldCreateCycle,
    /// The label does not fit the source node's kind.
    InvalidBranchLabel { label: Option<String> },
}

impl fmt::Display for EdgeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfLoop => write!(f, "a node cannot connect to itself"),
            Self::SourceIsAction => write!(f, "actions cannot have outgoing connections"),
            Self::Duplicate => write!(f, "these nodes are already connected"),
            Self::WouldCreateCycle => write!(f, "the connection would create a loop"),
            Self::InvalidBranchLabel { label: Some(label) } => {
                write!(f, "branch label '{label}' is not allowed here")
            }
            Self::InvalidBranchLabel { label: None } => {
                write!(f, "condition connections need a 'true' or 'false' branch")
            }
        }
    }
}

/// A global graph invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// A workflow always has at least one Trigger.
    LastTrigger,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastTrigger => write!(f, "a workflow needs at least one trigger"),
        }
    }
}

/// Errors from graph mutations.
///
/// A failed mutation always leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// The proposed edge violates a structural rule.
    InvalidEdge { reason: EdgeRejection },
    /// The operation would break a global invariant.
    InvariantViolation { invariant: Invariant },
    /// A node was given a NaN or infinite coordinate.
    InvalidPosition { node_id: NodeId },
}

impl GraphError {
    /// Returns true for errors caused by a stale or unknown id.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound { .. } | Self::EdgeNotFound { .. })
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::InvalidEdge { reason } => write!(f, "invalid edge: {reason}"),
            Self::InvariantViolation { invariant } => {
                write!(f, "invariant violation: {invariant}")
            }
            Self::InvalidPosition { node_id } => {
                write!(f, "node {node_id} cannot be placed at a non-finite position")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Why a persisted definition could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptReason {
    /// A node names a subtype missing from the catalog.
    UnknownSubtype { node: String, subtype: String },
    /// A node's kind disagrees with its subtype.
    KindMismatch {
        node: String,
        kind: String,
        subtype: String,
    },
    /// Two nodes share an ID.
    DuplicateNode { node: String },
    /// Two edges share an ID.
    DuplicateEdge { edge: String },
    /// An edge points at a node that does not exist.
    DanglingEndpoint { edge: String, endpoint: String },
    /// The record could not be decoded at all.
    Malformed { details: String },
}

impl fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSubtype { node, subtype } => {
                write!(f, "node {node} has unknown subtype '{subtype}'")
            }
            Self::KindMismatch {
                node,
                kind,
                subtype,
            } => write!(f, "node {node} has kind '{kind}' but subtype '{subtype}'"),
            Self::DuplicateNode { node } => write!(f, "duplicate node id {node}"),
            Self::DuplicateEdge { edge } => write!(f, "duplicate edge id {edge}"),
            Self::DanglingEndpoint { edge, endpoint } => {
                write!(f, "edge {edge} references missing node {endpoint}")
            }
            Self::Malformed { details } => write!(f, "malformed definition: {details}"),
        }
    }
}

/// Errors from saving or loading workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Save blocked by Error-severity findings.
    ValidationFailed { findings: Vec<Finding> },
    /// Load found an internally inconsistent definition.
    Corrupt { reason: CorruptReason },
    /// Another save for this workflow is still outstanding.
    SaveInFlight { workflow_id: WorkflowId },
    /// The backend has no definition for this workflow.
    NotFound { workflow_id: WorkflowId },
    /// The backend could not be reached (use as context wrapper).
    Transport { workflow_id: WorkflowId },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed { findings } => {
                write!(f, "workflow has {} blocking problem(s)", findings.len())
            }
            Self::Corrupt { reason } => write!(f, "corrupt workflow definition: {reason}"),
            Self::SaveInFlight { workflow_id } => {
                write!(f, "a save is already in progress for workflow {workflow_id}")
            }
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::Transport { workflow_id } => {
                write!(f, "storage unavailable for workflow {workflow_id}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Backend I/O failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub details: String,
}

impl TransportError {
    #[must_use]
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failure: {}", self.details)
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::NodeNotFound { node_id };
        assert!(err.to_string().contains("node not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn invalid_edge_surfaces_reason() {
        let err = GraphError::InvalidEdge {
            reason: EdgeRejection::SourceIsAction,
        };
        assert_eq!(
            err.to_string(),
            "invalid edge: actions cannot have outgoing connections"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn corrupt_display_names_endpoint() {
        let err = PersistenceError::Corrupt {
            reason: CorruptReason::DanglingEndpoint {
                edge: "edge_1".to_string(),
                endpoint: "node_2".to_string(),
            },
        };
        assert!(err.to_string().contains("missing node node_2"));
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::new("connection reset");
        assert_eq!(err.to_string(), "transport failure: connection reset");
    }
}
