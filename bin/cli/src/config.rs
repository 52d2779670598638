//! CLI configuration.
//!
//! Loaded via the `config` crate from `PATHWAY__*` environment variables.
//! Editor settings share the same prefix and are read by
//! [`EditorConfig::from_env`](pathway_workflow::EditorConfig::from_env).

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Directory holding one JSON document per workflow.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("workflows")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
        }
    }
}

impl CliConfig {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_dir_defaults_to_workflows() {
        let config: CliConfig = config::Config::builder()
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(config.store_dir, PathBuf::from("workflows"));
    }

    #[test]
    fn store_dir_can_be_overridden() {
        let config: CliConfig = config::Config::builder()
            .set_override("store_dir", "/var/lib/pathway")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/pathway"));
    }
}
