//! Chat backend implementations

pub mod ollama;

use crate::{ChatMessage, MessageEventStream, Result, StreamOptions};
use async_trait::async_trait;

/// Trait for streaming chat backends
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stream a completion for `messages` from `model`
    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &StreamOptions,
    ) -> Result<MessageEventStream>;
}

/// Get an API key from the provided value or an environment variable.
///
/// Local backends usually need none, so a missing key is not an error.
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(key) = provided {
        return Some(key.to_string());
    }

    std::env::var(env_var).ok().filter(|k| !k.is_empty())
}
