//! Structural validation of workflow graphs.
//!
//! Pure functions: they read a graph plus a proposed change and return a
//! verdict. Nothing here mutates state.

use crate::catalog::BRANCH_LABELS;
use crate::definition::Workflow;
use crate::error::{EdgeRejection, GraphError};
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeKind, ValidationStatus};
use pathway_core::{EdgeId, NodeId};
use std::collections::HashSet;
use std::fmt;

/// Checks whether a new edge may be added.
///
/// Cycle detection walks from `to` looking for `from`, which is O(V+E).
///
/// # Errors
///
/// Returns `NodeNotFound` for a missing endpoint and `InvalidEdge` for a
/// self-loop, an Action source, a label that does not fit the source kind,
/// an exact duplicate, or an edge that would close a cycle.
pub fn can_connect(
    graph: &WorkflowGraph,
    from: NodeId,
    to: NodeId,
    label: Option<&str>,
) -> Result<(), GraphError> {
    let source = graph
        .node(from)
        .ok_or(GraphError::NodeNotFound { node_id: from })?;
    if !graph.contains_node(to) {
        return Err(GraphError::NodeNotFound { node_id: to });
    }

    let reject = |reason| Err(GraphError::InvalidEdge { reason });

    if from == to {
        return reject(EdgeRejection::SelfLoop);
    }
    if source.kind() == NodeKind::Action {
        return reject(EdgeRejection::SourceIsAction);
    }
    if !label_fits(source.kind(), label) {
        return reject(EdgeRejection::InvalidBranchLabel {
            label: label.map(str::to_string),
        });
    }
    if graph
        .outgoing(from)
        .iter()
        .any(|edge| edge.same_route(from, to, label))
    {
        return reject(EdgeRejection::Duplicate);
    }
    if graph.has_path(to, from) {
        return reject(EdgeRejection::WouldCreateCycle);
    }

    Ok(())
}

/// Conditions branch on "true"/"false"; triggers emit unlabeled flow.
fn label_fits(kind: NodeKind, label: Option<&str>) -> bool {
    match kind {
        NodeKind::Condition => label.is_some_and(|l| BRANCH_LABELS.contains(&l)),
        NodeKind::Trigger => label.is_none(),
        NodeKind::Action => false,
    }
}

/// Returns the node's validation status against its subtype schema.
#[must_use]
pub fn validate_node(node: &Node) -> ValidationStatus {
    node.status().clone()
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; does not block persistence.
    Warning,
    /// Blocks persistence.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingTarget {
    Workflow,
    Node(NodeId),
    Edge(EdgeId),
}

impl fmt::Display for FindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow => f.write_str("workflow"),
            Self::Node(id) => write!(f, "{id}"),
            Self::Edge(id) => write!(f, "{id}"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub target: FindingTarget,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn error(target: FindingTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(target: FindingTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.target, self.message)
    }
}

/// Returns true if any finding blocks persistence.
#[must_use]
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_error)
}

/// Aggregate check run before persistence.
///
/// Errors: no Trigger, invalid nodes, edges leaving an Action, self-loops,
/// duplicate edges, cycles. Warnings: nodes no Trigger reaches, Conditions
/// without outgoing branches.
#[must_use]
pub fn validate_graph(workflow: &Workflow) -> Vec<Finding> {
    let graph = workflow.graph();
    let mut findings = Vec::new();

    if graph.trigger_count() == 0 {
        findings.push(Finding::error(
            FindingTarget::Workflow,
            "workflow has no trigger",
        ));
    }

    for node in graph.nodes() {
        if !node.position.is_finite() {
            findings.push(Finding::error(
                FindingTarget::Node(node.id),
                "node has a non-finite position",
            ));
        }
        if let ValidationStatus::Invalid(issues) = validate_node(node) {
            let reasons: Vec<String> = issues.iter().map(ToString::to_string).collect();
            findings.push(Finding::error(
                FindingTarget::Node(node.id),
                reasons.join("; "),
            ));
        }
    }

    let mut routes = HashSet::new();
    for edge in graph.edges() {
        let target = FindingTarget::Edge(edge.id);
        if edge.from == edge.to {
            findings.push(Finding::error(target, "edge connects a node to itself"));
        }
        if graph.node(edge.from).map(Node::kind) == Some(NodeKind::Action) {
            findings.push(Finding::error(target, "edge leaves an action"));
        }
        if !routes.insert((edge.from, edge.to, edge.label.as_deref())) {
            findings.push(Finding::error(target, "duplicate edge"));
        }
    }

    if graph.is_cyclic() {
        findings.push(Finding::error(
            FindingTarget::Workflow,
            "workflow contains a loop",
        ));
    }

    let reachable = graph.reachable_from_triggers();
    for node in graph.nodes() {
        if !reachable.contains(&node.id) {
            findings.push(Finding::warning(
                FindingTarget::Node(node.id),
                "no trigger leads to this node",
            ));
        }
        if node.kind() == NodeKind::Condition && graph.outgoing(node.id).is_empty() {
            findings.push(Finding::warning(
                FindingTarget::Node(node.id),
                "condition has no branches",
            ));
        }
    }

    findings
}
