//! recap-ai: Inference gateway for local chat-completions backends
//!
//! This crate provides the `InferenceGateway` abstraction the turn executor
//! talks to, along with a streaming client for Ollama and other
//! OpenAI-compatible servers.

pub mod error;
pub mod gateway;
pub mod providers;
pub mod retry;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use gateway::{GenerateRequest, InferenceGateway, ProviderGateway};
pub use retry::{RetryConfig, RetryingGateway};
pub use stream::MessageEventStream;
pub use types::*;
