//! Static node-subtype catalog.
//!
//! Each node type declares display metadata and an ordered field schema.
//! Validation looks the schema up by tag; it never probes config shapes.

use crate::node::{
    ActionType, ConditionType, FieldIssue, NodeConfig, NodeType, TriggerType, ValidationStatus,
};
use serde_json::Value as JsonValue;

/// Expected shape of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Non-empty string.
    Text,
    /// Whole number within an inclusive range.
    Integer { min: i64, max: i64 },
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str]),
}

impl FieldType {
    fn describe(self) -> String {
        match self {
            Self::Text => "a non-empty string".to_string(),
            Self::Integer { min, max } => format!("an integer between {min} and {max}"),
            Self::OneOf(values) => format!("one of {}", values.join(", ")),
        }
    }

    fn accepts(self, value: &JsonValue) -> bool {
        match self {
            Self::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Self::Integer { min, max } => value.as_i64().is_some_and(|n| (min..=max).contains(&n)),
            Self::OneOf(values) => value.as_str().is_some_and(|s| values.contains(&s)),
        }
    }
}

/// A declared config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

const fn required(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        required: true,
    }
}

const fn optional(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        required: false,
    }
}

/// Catalog entry for one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtypeSpec {
    pub node_type: NodeType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SubtypeSpec {
    /// Names of the fields that must be present for the node to be valid.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

const DELAY_MS: FieldType = FieldType::Integer {
    min: 0,
    max: 3_600_000,
};

/// Branch labels accepted on edges leaving a Condition.
pub const BRANCH_LABELS: [&str; 2] = ["true", "false"];

/// Returns the catalog entry for a node type.
#[must_use]
pub fn spec_for(node_type: NodeType) -> &'static SubtypeSpec {
    match node_type {
        NodeType::Trigger(TriggerType::PageVisit) => &PAGE_VISIT,
        NodeType::Trigger(TriggerType::TimeOnPage) => &TIME_ON_PAGE,
        NodeType::Trigger(TriggerType::ScrollDepth) => &SCROLL_DEPTH,
        NodeType::Trigger(TriggerType::ExitIntent) => &EXIT_INTENT,
        NodeType::Condition(ConditionType::UrlMatches) => &URL_MATCHES,
        NodeType::Condition(ConditionType::DeviceType) => &DEVICE_TYPE,
        NodeType::Condition(ConditionType::VisitCount) => &VISIT_COUNT,
        NodeType::Condition(ConditionType::Referrer) => &REFERRER,
        NodeType::Action(ActionType::ShowPopup) => &SHOW_POPUP,
        NodeType::Action(ActionType::ShowBanner) => &SHOW_BANNER,
        NodeType::Action(ActionType::Redirect) => &REDIRECT,
        NodeType::Action(ActionType::SendWebhook) => &SEND_WEBHOOK,
    }
}

/// Returns every catalog entry in catalog order.
pub fn entries() -> impl Iterator<Item = &'static SubtypeSpec> {
    NodeType::ALL.into_iter().map(spec_for)
}

/// Checks a config against its subtype's schema.
///
/// Issues follow schema field order. Undeclared keys are ignored.
#[must_use]
pub fn validate_config(node_type: NodeType, config: &NodeConfig) -> ValidationStatus {
    let issues: Vec<FieldIssue> = spec_for(node_type)
        .fields
        .iter()
        .filter_map(|field| match config.get(field.name) {
            None if field.required => Some(FieldIssue::Missing { field: field.name }),
            None => None,
            Some(value) if field.field_type.accepts(value) => None,
            Some(_) => Some(FieldIssue::Malformed {
                field: field.name,
                expected: field.field_type.describe(),
            }),
        })
        .collect();

    if issues.is_empty() {
        ValidationStatus::Valid
    } else {
        ValidationStatus::Invalid(issues)
    }
}

static PAGE_VISIT: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Trigger(TriggerType::PageVisit),
    display_name: "Page visit",
    description: "Starts when a visitor opens a matching page.",
    fields: &[required("url-pattern", FieldType::Text)],
};

static TIME_ON_PAGE: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Trigger(TriggerType::TimeOnPage),
    display_name: "Time on page",
    description: "Starts after a visitor has stayed on a page for a while.",
    fields: &[
        required("delay-ms", DELAY_MS),
        optional("url-pattern", FieldType::Text),
    ],
};

static SCROLL_DEPTH: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Trigger(TriggerType::ScrollDepth),
    display_name: "Scroll depth",
    description: "Starts when a visitor scrolls past a percentage of the page.",
    fields: &[required("percent", FieldType::Integer { min: 1, max: 100 })],
};

static EXIT_INTENT: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Trigger(TriggerType::ExitIntent),
    display_name: "Exit intent",
    description: "Starts when a visitor is about to leave the page.",
    fields: &[],
};

static URL_MATCHES: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Condition(ConditionType::UrlMatches),
    display_name: "URL matches",
    description: "Branches on whether the current URL matches a pattern.",
    fields: &[required("pattern", FieldType::Text)],
};

static DEVICE_TYPE: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Condition(ConditionType::DeviceType),
    display_name: "Device type",
    description: "Branches on the visitor's device class.",
    fields: &[required(
        "device",
        FieldType::OneOf(&["desktop", "mobile", "tablet"]),
    )],
};

static VISIT_COUNT: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Condition(ConditionType::VisitCount),
    display_name: "Visit count",
    description: "Branches on how many times the visitor has been here.",
    fields: &[required(
        "min-visits",
        FieldType::Integer { min: 1, max: 10_000 },
    )],
};

static REFERRER: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Condition(ConditionType::Referrer),
    display_name: "Referrer",
    description: "Branches on where the visitor came from.",
    fields: &[required("contains", FieldType::Text)],
};

static SHOW_POPUP: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Action(ActionType::ShowPopup),
    display_name: "Show popup",
    description: "Opens a modal popup.",
    fields: &[
        required("title", FieldType::Text),
        required("body", FieldType::Text),
        optional("delay-ms", DELAY_MS),
    ],
};

static SHOW_BANNER: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Action(ActionType::ShowBanner),
    display_name: "Show banner",
    description: "Displays an inline banner.",
    fields: &[
        required("message", FieldType::Text),
        optional("placement", FieldType::OneOf(&["top", "bottom"])),
    ],
};

static REDIRECT: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Action(ActionType::Redirect),
    display_name: "Redirect",
    description: "Sends the visitor to another URL.",
    fields: &[required("url", FieldType::Text)],
};

static SEND_WEBHOOK: SubtypeSpec = SubtypeSpec {
    node_type: NodeType::Action(ActionType::SendWebhook),
    display_name: "Send webhook",
    description: "Posts the event to an external endpoint.",
    fields: &[
        required("url", FieldType::Text),
        optional("method", FieldType::OneOf(&["GET", "POST"])),
    ],
};
