//! File-based run configuration
//!
//! ```yaml
//! max_depth: 25
//! workflow_id: nightly-review
//! checkpointer:
//!   kind: sqlite3
//!   connection: /var/lib/clan/checkpoints.db
//! ```

use crate::error::{GraphError, Result};
use crate::executor::{ExecuteOptions, DEFAULT_MAX_DEPTH};
use clan_checkpoint::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable counterpart of [`ExecuteOptions`]
///
/// The stream sink is runtime-only and is attached to the options after
/// conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpointer: Option<StoreConfig>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            workflow_id: None,
            checkpointer: None,
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.checkpointer.is_some() && self.workflow_id.as_deref().map_or(true, str::is_empty) {
            return Err(GraphError::Configuration(
                "a checkpointer needs a non-empty workflow_id".to_string(),
            ));
        }
        Ok(())
    }

    /// Open the configured store and build run options
    pub fn into_options<S>(self) -> Result<ExecuteOptions<S>> {
        self.validate()?;

        let mut options = ExecuteOptions::new().with_max_depth(self.max_depth);
        if let Some(workflow_id) = self.workflow_id {
            options = options.with_workflow_id(workflow_id);
        }
        if let Some(store) = self.checkpointer {
            options = options.with_checkpointer(store.open()?);
        }
        Ok(options)
    }
}
