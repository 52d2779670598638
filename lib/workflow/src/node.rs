//! Workflow node types.
//!
//! Nodes are the building blocks of a workflow. Each node has:
//! - A unique ID within the workflow
//! - A type, tagged by kind (Trigger, Condition, Action) and subtype
//! - A canvas position
//! - A subtype-specific configuration map
//! - A validation status derived from the subtype's field schema

use crate::catalog;
use pathway_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Subtype-specific node parameters.
///
/// Keys not declared by the subtype's schema are kept as-is so definitions
/// written by newer editors survive a round trip.
pub type NodeConfig = Map<String, JsonValue>;

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Visitor behavior that starts the workflow.
    Trigger,
    /// Predicate that routes flow along "true"/"false" branches.
    Condition,
    /// Effect performed on the page. Never has outgoing edges.
    Action,
}

impl NodeKind {
    /// Returns the persisted name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
    /// Visitor lands on a matching page.
    PageVisit,
    /// Visitor has stayed on a page for a given time.
    TimeOnPage,
    /// Visitor has scrolled past a depth threshold.
    ScrollDepth,
    /// Pointer leaves the viewport towards the browser chrome.
    ExitIntent,
}

/// Condition subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    /// Current URL matches a pattern.
    UrlMatches,
    /// Visitor device class.
    DeviceType,
    /// Visitor has at least N recorded visits.
    VisitCount,
    /// Referrer contains a substring.
    Referrer,
}

/// Action subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Modal popup.
    ShowPopup,
    /// Inline banner.
    ShowBanner,
    /// Navigate the visitor elsewhere.
    Redirect,
    /// Notify an external endpoint.
    SendWebhook,
}

/// The type of a node, tagged by kind.
///
/// The kind is always derived from the tag, so a node can never carry a
/// subtype that belongs to a different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Trigger(TriggerType),
    Condition(ConditionType),
    Action(ActionType),
}

impl NodeType {
    /// Every node type in catalog order.
    pub const ALL: [Self; 12] = [
        Self::Trigger(TriggerType::PageVisit),
        Self::Trigger(TriggerType::TimeOnPage),
        Self::Trigger(TriggerType::ScrollDepth),
        Self::Trigger(TriggerType::ExitIntent),
        Self::Condition(ConditionType::UrlMatches),
        Self::Condition(ConditionType::DeviceType),
        Self::Condition(ConditionType::VisitCount),
        Self::Condition(ConditionType::Referrer),
        Self::Action(ActionType::ShowPopup),
        Self::Action(ActionType::ShowBanner),
        Self::Action(ActionType::Redirect),
        Self::Action(ActionType::SendWebhook),
    ];

    /// Returns the kind of this node type.
    #[must_use]
    pub const fn kind(self) -> NodeKind {
        match self {
            Self::Trigger(_) => NodeKind::Trigger,
            Self::Condition(_) => NodeKind::Condition,
            Self::Action(_) => NodeKind::Action,
        }
    }

    /// Returns the persisted subtype name (e.g. `"page-visit"`).
    #[must_use]
    pub const fn subtype(self) -> &'static str {
        match self {
            Self::Trigger(TriggerType::PageVisit) => "page-visit",
            Self::Trigger(TriggerType::TimeOnPage) => "time-on-page",
            Self::Trigger(TriggerType::ScrollDepth) => "scroll-depth",
            Self::Trigger(TriggerType::ExitIntent) => "exit-intent",
            Self::Condition(ConditionType::UrlMatches) => "url-matches",
            Self::Condition(ConditionType::DeviceType) => "device-type",
            Self::Condition(ConditionType::VisitCount) => "visit-count",
            Self::Condition(ConditionType::Referrer) => "referrer",
            Self::Action(ActionType::ShowPopup) => "show-popup",
            Self::Action(ActionType::ShowBanner) => "show-banner",
            Self::Action(ActionType::Redirect) => "redirect",
            Self::Action(ActionType::SendWebhook) => "send-webhook",
        }
    }

    /// Looks up a node type from its kind and subtype name.
    ///
    /// Returns `None` if the subtype is unknown or belongs to another kind.
    #[must_use]
    pub fn from_parts(kind: NodeKind, subtype: &str) -> Option<Self> {
        let node_type = subtype.parse::<Self>().ok()?;
        (node_type.kind() == kind).then_some(node_type)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.subtype())
    }
}

/// Error returned when a subtype name is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubtype(pub String);

impl fmt::Display for UnknownSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node subtype '{}'", self.0)
    }
}

impl std::error::Error for UnknownSubtype {}

impl FromStr for NodeType {
    type Err = UnknownSubtype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|node_type| node_type.subtype() == s)
            .ok_or_else(|| UnknownSubtype(s.to_string()))
    }
}

/// A position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite. Only finite positions
    /// can be written to a definition.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Why a config field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    /// A required field is absent.
    Missing { field: &'static str },
    /// A field is present but has the wrong type or an out-of-range value.
    Malformed { field: &'static str, expected: String },
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "missing required field '{field}'"),
            Self::Malformed { field, expected } => {
                write!(f, "field '{field}' must be {expected}")
            }
        }
    }
}

/// Validation status of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationStatus {
    #[default]
    Valid,
    /// Issues ordered by the subtype schema's field order.
    Invalid(Vec<FieldIssue>),
}

impl ValidationStatus {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Node type (determines kind and config schema).
    pub node_type: NodeType,
    /// Canvas position.
    pub position: Position,
    config: NodeConfig,
    /// False when the node was loaded from a record without a `config` field.
    config_stored: bool,
    /// Record fields this editor does not understand, kept for the next save.
    pub(crate) extra: NodeConfig,
    status: ValidationStatus,
}

impl Node {
    /// Creates a node with an empty config.
    #[must_use]
    pub fn new(node_type: NodeType, position: Position) -> Self {
        Self::with_id(NodeId::new(), node_type, position, NodeConfig::new())
    }

    /// Creates a node with a specific ID and config.
    #[must_use]
    pub fn with_id(id: NodeId, node_type: NodeType, position: Position, config: NodeConfig) -> Self {
        let mut node = Self {
            id,
            node_type,
            position,
            config,
            config_stored: true,
            extra: NodeConfig::new(),
            status: ValidationStatus::Valid,
        };
        node.revalidate();
        node
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.node_type.kind()
    }

    /// Subtype-specific parameters.
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Returns the config as it should be written, `None` if the record it
    /// was loaded from had no config and nothing has been set since.
    pub(crate) fn stored_config(&self) -> Option<&NodeConfig> {
        self.config_stored.then_some(&self.config)
    }

    pub(crate) fn without_stored_config(mut self) -> Self {
        self.config_stored = false;
        self
    }

    /// Returns the current validation status.
    #[must_use]
    pub fn status(&self) -> &ValidationStatus {
        &self.status
    }

    /// Merges fields into the config and recomputes the validation status.
    ///
    /// A `null` value removes the key.
    pub fn merge_config(&mut self, partial: NodeConfig) {
        for (key, value) in partial {
            if value.is_null() {
                self.config.remove(&key);
            } else {
                self.config.insert(key, value);
            }
        }
        self.config_stored = true;
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.status = catalog::validate_config(self.node_type, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: JsonValue) -> NodeConfig {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn subtype_names_round_trip() {
        for node_type in NodeType::ALL {
            let parsed: NodeType = node_type.subtype().parse().expect("known subtype");
            assert_eq!(parsed, node_type);
        }
    }

    #[test]
    fn from_parts_rejects_kind_mismatch() {
        assert_eq!(
            NodeType::from_parts(NodeKind::Trigger, "page-visit"),
            Some(NodeType::Trigger(TriggerType::PageVisit))
        );
        assert_eq!(NodeType::from_parts(NodeKind::Action, "page-visit"), None);
        assert_eq!(NodeType::from_parts(NodeKind::Action, "teleport"), None);
    }

    #[test]
    fn new_node_with_required_fields_is_invalid() {
        let node = Node::new(NodeType::Action(ActionType::ShowPopup), Position::default());
        assert!(node.config().is_empty());
        assert!(!node.status().is_valid());
    }

    #[test]
    fn exit_intent_is_valid_without_config() {
        let node = Node::new(NodeType::Trigger(TriggerType::ExitIntent), Position::default());
        assert!(node.status().is_valid());
    }

    #[test]
    fn merge_config_overwrites_and_removes() {
        let mut node = Node::new(NodeType::Trigger(TriggerType::PageVisit), Position::default());
        node.merge_config(config(json!({ "url-pattern": "/pricing", "utm": "x" })));
        assert!(node.status().is_valid());

        node.merge_config(config(json!({ "url-pattern": null })));
        assert!(!node.config().contains_key("url-pattern"));
        assert_eq!(node.config().get("utm"), Some(&json!("x")));
        assert_eq!(
            node.status(),
            &ValidationStatus::Invalid(vec![FieldIssue::Missing { field: "url-pattern" }])
        );
    }
}
