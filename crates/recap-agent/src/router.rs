//! Picks the worker that runs next in a turn

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::{
    config::TurnConfig,
    error::{Error, Result},
    state::ConversationState,
};

/// The worker a turn moves to after routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextWorker {
    /// Condense the history before answering
    Summarize,
    /// Answer the latest user message
    Respond,
}

impl std::fmt::Display for NextWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextWorker::Summarize => f.write_str("summarize"),
            NextWorker::Respond => f.write_str("respond"),
        }
    }
}

/// Counter-driven router
#[derive(Debug, Clone, Copy)]
pub struct Router {
    threshold: NonZeroU32,
}

impl Router {
    /// Create a router that compresses every `threshold` turns
    pub fn new(threshold: NonZeroU32) -> Self {
        Self { threshold }
    }

    /// Create a router from executor configuration
    pub fn from_config(config: &TurnConfig) -> Result<Self> {
        NonZeroU32::new(config.threshold)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidConfig("threshold must be at least 1".into()))
    }

    /// The compression threshold
    pub fn threshold(&self) -> NonZeroU32 {
        self.threshold
    }

    /// Decide what runs next.
    ///
    /// A zero counter never summarizes: that is a conversation that was just
    /// compressed or has not counted a turn yet.
    pub fn route(&self, state: &ConversationState) -> NextWorker {
        let count = state.step_count;
        if count > 0 && count % u64::from(self.threshold.get()) == 0 {
            NextWorker::Summarize
        } else {
            NextWorker::Respond
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(NonZeroU32::new(crate::config::DEFAULT_THRESHOLD).unwrap_or(NonZeroU32::MIN))
    }
}
