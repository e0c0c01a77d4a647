//! Error types for recap-ai

use thiserror::Error;

/// Result type alias using recap-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to an inference backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Request was cancelled by the caller
    #[error("Request aborted")]
    Aborted,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Backend finished without producing any text
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Unavailable(_) | Error::Timeout(_) | Error::Sse(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("overloaded")
                    || et.starts_with("http_5")
                    || msg.contains("overloaded")
                    || msg.contains("server busy")
                    || msg.contains("model is loading")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_typed_variants() {
        assert!(Error::Unavailable("connection refused".into()).is_retryable());
        assert!(Error::Timeout("no response after 30s".into()).is_retryable());
        assert!(Error::Sse("connection reset".into()).is_retryable());
    }

    #[test]
    fn test_retryable_api_server_error() {
        let e = Error::api("http_503", "Service Unavailable");
        assert!(e.is_retryable());
    }

    #[test]
    fn test_retryable_api_model_loading() {
        let e = Error::api("server_error", "Model is loading, please wait");
        assert!(e.is_retryable());
    }

    #[test]
    fn test_not_retryable_api_bad_request() {
        let e = Error::api("http_404", "model 'qwen3-4b' not found, try pulling it first");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_not_retryable_non_api() {
        assert!(!Error::Aborted.is_retryable());
        assert!(!Error::EmptyResponse.is_retryable());
        assert!(!Error::InvalidConfig("no model".into()).is_retryable());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::Timeout("connect".into()).is_timeout());
        assert!(!Error::Unavailable("down".into()).is_timeout());
        assert!(!Error::Aborted.is_timeout());
    }
}
