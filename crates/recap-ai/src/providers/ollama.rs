//! Ollama (OpenAI-compatible chat completions) provider
//!
//! Talks to `/v1/chat/completions` with `stream: true`. Any server that speaks
//! the same dialect (llama.cpp, LM Studio, vLLM) works with a different base URL.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    providers::{ChatProvider, get_api_key},
    stream::{MessageEvent, MessageEventStream, StreamErrorKind},
    types::{ChatMessage, StreamOptions, Usage},
};

/// Default address of a local Ollama daemon
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Environment variable consulted for an optional bearer token
pub const API_KEY_ENV: &str = "RECAP_API_KEY";

/// Connection settings for an Ollama-compatible backend
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, with or without a trailing `/v1`
    pub base_url: String,
    /// Bearer token, for proxies that require one
    pub api_key: Option<String>,
    /// Deadline for establishing the connection
    pub connect_timeout: Duration,
    /// Deadline for the whole request, including the streamed body
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl OllamaConfig {
    /// Build a config from `OLLAMA_HOST` and `RECAP_API_KEY`
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .map(|host| normalize_host(&host))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            base_url,
            api_key: get_api_key(None, API_KEY_ENV),
            ..Default::default()
        }
    }
}

/// `OLLAMA_HOST` is commonly given as `host:port` without a scheme
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

/// Ollama API client
pub struct OllamaProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new provider
    pub fn new(config: OllamaConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base_url must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    /// The provider's connection settings
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn chat_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn build_request<'a>(
        &self,
        model: &'a str,
        messages: &'a [ChatMessage],
        options: &StreamOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages,
            stream: true,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream_options: Some(WireStreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &StreamOptions,
    ) -> Result<MessageEventStream> {
        let request = self.build_request(model, messages, options);
        let url = self.chat_url();

        tracing::debug!(%url, model, messages = messages.len(), "Opening completion stream");

        let mut request_builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request);
        if let Some(ref key) = self.config.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.to_string())))
    }
}

fn create_stream(
    mut event_source: EventSource,
    model: String,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield MessageEvent::Start { model: model.clone() };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match parse_chunk(&msg.data) {
                        Ok(chunk) => {
                            if let Some(err) = chunk.error {
                                event_source.close();
                                yield MessageEvent::Error {
                                    kind: StreamErrorKind::Api,
                                    message: err.message,
                                };
                                return;
                            }

                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    if !content.is_empty() {
                                        accumulated_text.push_str(content);
                                        yield MessageEvent::TextDelta {
                                            delta: content.clone(),
                                        };
                                    }
                                }

                                if let Some(ref reason) = choice.finish_reason {
                                    finish_reason = Some(reason.clone());
                                }
                            }

                            if let Some(ref stream_usage) = chunk.usage {
                                usage.input = stream_usage.prompt_tokens;
                                usage.output = stream_usage.completion_tokens;
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            yield MessageEvent::Error {
                                kind: StreamErrorKind::Protocol,
                                message: format!("Failed to parse chunk: {}", e),
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    // EventSource reconnects by default; a chat completion is not resumable
                    event_source.close();
                    let (kind, message) = classify_event_error(e).await;
                    yield MessageEvent::Error { kind, message };
                    return;
                }
            }
        }

        event_source.close();

        yield MessageEvent::Done {
            text: accumulated_text,
            finish_reason,
            usage,
        };
    }
}

async fn classify_event_error(error: reqwest_eventsource::Error) -> (StreamErrorKind, String) {
    match error {
        reqwest_eventsource::Error::Transport(e) => (classify_transport(&e), e.to_string()),
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("{}: {}", status, body.trim()));
            let kind = if status.is_server_error() {
                StreamErrorKind::Unavailable
            } else {
                StreamErrorKind::Api
            };
            (kind, message)
        }
        other => {
            let kind = find_transport_error(&other)
                .map(classify_transport)
                .unwrap_or(StreamErrorKind::Protocol);
            (kind, format!("SSE error: {}", other))
        }
    }
}

fn classify_transport(error: &reqwest::Error) -> StreamErrorKind {
    if error.is_timeout() {
        StreamErrorKind::Timeout
    } else {
        StreamErrorKind::Unavailable
    }
}

/// Walk the source chain looking for the underlying HTTP failure
fn find_transport_error<'a>(
    error: &'a (dyn std::error::Error + 'static),
) -> Option<&'a reqwest::Error> {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(transport) = e.downcast_ref::<reqwest::Error>() {
            return Some(transport);
        }
        current = e.source();
    }
    None
}

fn parse_chunk(data: &str) -> std::result::Result<StreamChunk, serde_json::Error> {
    serde_json::from_str(data)
}

/// Pull a human-readable message out of an error body, if it is JSON
fn extract_error_message(body: &str) -> Option<String> {
    let parsed: ErrorEnvelope = serde_json::from_str(body).ok()?;
    match parsed.error {
        ErrorBody::Detailed { message } => Some(message),
        ErrorBody::Plain(message) => Some(message),
    }
}

// Request types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<WireStreamOptions>,
}

#[derive(Debug, Serialize)]
struct WireStreamOptions {
    include_usage: bool,
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Ollama returns `{"error": "..."}`; OpenAI-style servers nest a message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}
