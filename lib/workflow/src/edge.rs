//! Edge types for workflow graphs.
//!
//! Edges are directed connections between two nodes. Edges leaving a
//! Condition carry a branch label ("true"/"false").

use pathway_core::{EdgeId, NodeId};
use serde_json::{Map, Value as JsonValue};

/// A directed edge in a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique identifier for this edge within the workflow.
    pub id: EdgeId,
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Branch label, if any.
    pub label: Option<String>,
    /// Record fields this editor does not understand.
    pub(crate) extra: Map<String, JsonValue>,
}

impl Edge {
    /// Creates a new edge with a fresh ID.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, label: Option<String>) -> Self {
        Self::with_id(EdgeId::new(), from, to, label)
    }

    /// Creates an edge with a specific ID.
    #[must_use]
    pub fn with_id(id: EdgeId, from: NodeId, to: NodeId, label: Option<String>) -> Self {
        Self {
            id,
            from,
            to,
            label,
            extra: Map::new(),
        }
    }

    /// Returns true if this edge connects the same endpoints with the same label.
    #[must_use]
    pub fn same_route(&self, from: NodeId, to: NodeId, label: Option<&str>) -> bool {
        self.from == from && self.to == to && self.label.as_deref() == label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_route_compares_label() {
        let from = NodeId::new();
        let to = NodeId::new();
        let edge = Edge::new(from, to, Some("true".to_string()));

        assert!(edge.same_route(from, to, Some("true")));
        assert!(!edge.same_route(from, to, Some("false")));
        assert!(!edge.same_route(from, to, None));
        assert!(!edge.same_route(to, from, Some("true")));
    }
}
