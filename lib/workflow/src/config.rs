//! Editor configuration.
//!
//! Loaded via the `config` crate from `PATHWAY__*` environment variables,
//! e.g. `PATHWAY__HISTORY_LIMIT=100`.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::node::{NodeKind, NodeType, TriggerType};
use serde::Deserialize;

/// Settings for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditorConfig {
    /// Undo steps retained before the oldest are evicted.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Whether node moves get their own undo steps.
    #[serde(default = "default_record_moves")]
    pub record_moves: bool,

    /// Subtype of the trigger placed in fresh workflows.
    #[serde(default = "default_trigger")]
    pub default_trigger: String,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_record_moves() -> bool {
    true
}

fn default_trigger() -> String {
    NodeType::Trigger(TriggerType::PageVisit).subtype().to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            record_moves: default_record_moves(),
            default_trigger: default_trigger(),
        }
    }
}

impl EditorConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("PATHWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Resolves the configured default trigger.
    ///
    /// Falls back to a page-visit trigger if the name is unknown or not a
    /// trigger subtype.
    #[must_use]
    pub fn trigger_type(&self) -> NodeType {
        NodeType::from_parts(NodeKind::Trigger, &self.default_trigger).unwrap_or_else(|| {
            tracing::warn!(
                default_trigger = %self.default_trigger,
                "Configured default trigger is not a trigger subtype, using page-visit"
            );
            NodeType::Trigger(TriggerType::PageVisit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 50);
        assert!(config.record_moves);
        assert_eq!(
            config.trigger_type(),
            NodeType::Trigger(TriggerType::PageVisit)
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: EditorConfig = config::Config::builder()
            .set_override("history_limit", 5)
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.history_limit, 5);
        assert!(config.record_moves);
        assert_eq!(config.default_trigger, "page-visit");
    }

    #[test]
    fn non_trigger_default_falls_back() {
        let config = EditorConfig {
            default_trigger: "show-popup".to_string(),
            ..EditorConfig::default()
        };
        assert_eq!(
            config.trigger_type(),
            NodeType::Trigger(TriggerType::PageVisit)
        );

        let config = EditorConfig {
            default_trigger: "exit-intent".to_string(),
            ..EditorConfig::default()
        };
        assert_eq!(
            config.trigger_type(),
            NodeType::Trigger(TriggerType::ExitIntent)
        );
    }
}
