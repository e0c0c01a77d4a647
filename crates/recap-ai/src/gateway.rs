//! The inference gateway: one request in, one block of text out

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    providers::ChatProvider,
    stream::TextAccumulator,
    types::{ChatMessage, ModelRole, StreamOptions},
};

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Which inference profile this request is for
    pub role: ModelRole,
    /// Concrete model identifier backing that role
    pub model: String,
    /// Ordered, role-tagged prompt
    pub messages: Vec<ChatMessage>,
}

impl GenerateRequest {
    /// Create a new request
    pub fn new(role: ModelRole, model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            role,
            model: model.into(),
            messages,
        }
    }
}

/// Anything that can turn a prompt into generated text
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Generate a completion for `request`.
    ///
    /// Implementations must return promptly with [`Error::Aborted`] once
    /// `cancel` fires.
    async fn generate(&self, request: &GenerateRequest, cancel: CancellationToken)
    -> Result<String>;
}

/// Gateway that drives a streaming [`ChatProvider`] to completion
pub struct ProviderGateway<P> {
    provider: P,
    options: StreamOptions,
}

impl<P: ChatProvider> ProviderGateway<P> {
    /// Create a new gateway over `provider`
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: StreamOptions::default(),
        }
    }

    /// Set streaming options applied to every request
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn collect(&self, request: &GenerateRequest) -> Result<String> {
        let mut stream = self
            .provider
            .stream(&request.model, &request.messages, &self.options)
            .await?;

        let mut acc = TextAccumulator::new();
        while let Some(event) = stream.next().await {
            acc.process_event(&event);
            if event.is_terminal() {
                break;
            }
        }

        if let Some(err) = acc.take_error() {
            return Err(err);
        }
        if !acc.is_finished() {
            return Err(Error::Sse("stream ended before completion".into()));
        }
        if acc.text().trim().is_empty() {
            return Err(Error::EmptyResponse);
        }

        let usage = acc.usage();
        tracing::debug!(
            role = %request.role,
            model = %request.model,
            input_tokens = usage.input,
            output_tokens = usage.output,
            "Completion finished"
        );

        Ok(acc.into_text())
    }
}

#[async_trait]
impl<P: ChatProvider> InferenceGateway for ProviderGateway<P> {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(Error::Aborted);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Aborted),
            result = self.collect(request) => result,
        }
    }
}

#[async_trait]
impl<G: InferenceGateway + ?Sized> InferenceGateway for std::sync::Arc<G> {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<String> {
        (**self).generate(request, cancel).await
    }
}
