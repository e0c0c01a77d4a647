//! Turn executor configuration

use serde::{Deserialize, Serialize};

use recap_ai::ModelRole;

use crate::error::{Error, Result};

/// Default number of answered turns between compressions
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Default model for the cheap (summarization) role
pub const DEFAULT_CHEAP_MODEL: &str = "qwen3-4b:latest";

/// Default model for the capable (answering) role
pub const DEFAULT_CAPABLE_MODEL: &str = "qwen2.5-coder-7b:latest";

/// Settings fixed for the lifetime of a [`TurnExecutor`](crate::TurnExecutor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Compress whenever the turn counter reaches a multiple of this
    pub threshold: u32,
    /// Model backing the cheap role
    pub cheap_model_id: String,
    /// Model backing the capable role
    pub capable_model_id: String,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            cheap_model_id: DEFAULT_CHEAP_MODEL.to_string(),
            capable_model_id: DEFAULT_CAPABLE_MODEL.to_string(),
        }
    }
}

impl TurnConfig {
    /// Set the compression threshold
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set both model identifiers
    pub fn with_models(mut self, cheap: impl Into<String>, capable: impl Into<String>) -> Self {
        self.cheap_model_id = cheap.into();
        self.capable_model_id = capable.into();
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::InvalidConfig("threshold must be at least 1".into()));
        }
        if self.cheap_model_id.trim().is_empty() {
            return Err(Error::InvalidConfig("cheap_model_id must not be empty".into()));
        }
        if self.capable_model_id.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "capable_model_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Model identifier backing `role`
    pub fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Cheap => &self.cheap_model_id,
            ModelRole::Capable => &self.capable_model_id,
        }
    }
}
