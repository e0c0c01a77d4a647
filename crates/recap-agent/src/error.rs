//! Error types for recap-agent

use thiserror::Error;

use crate::router::NextWorker;

/// Result type alias using recap-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a turn.
///
/// A failed turn never touches the caller's state, so every variant is safe
/// to retry against the same prior state.
#[derive(Error, Debug)]
pub enum Error {
    /// The inference backend could not be reached or failed mid-request
    #[error("Inference gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The inference backend did not answer in time
    #[error("Inference gateway timed out: {0}")]
    GatewayTimeout(String),

    /// A worker got back no usable text
    #[error("{worker} step produced an empty generation")]
    EmptyGenerationResult { worker: NextWorker },

    /// The caller cancelled the turn
    #[error("Turn cancelled")]
    Cancelled,

    /// The executor was built with unusable settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Classify a gateway failure raised while `worker` was running
    pub fn from_gateway(error: recap_ai::Error, worker: NextWorker) -> Self {
        match error {
            recap_ai::Error::Aborted => Error::Cancelled,
            recap_ai::Error::EmptyResponse => Error::EmptyGenerationResult { worker },
            recap_ai::Error::InvalidConfig(msg) => Error::InvalidConfig(msg),
            e if e.is_timeout() => Error::GatewayTimeout(e.to_string()),
            e => Error::GatewayUnavailable(e.to_string()),
        }
    }

    /// Whether the caller may reasonably retry the same turn
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::GatewayUnavailable(_) | Error::GatewayTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gateway_classification() {
        let e = Error::from_gateway(
            recap_ai::Error::Unavailable("connection refused".into()),
            NextWorker::Respond,
        );
        assert!(matches!(e, Error::GatewayUnavailable(_)));

        let e = Error::from_gateway(
            recap_ai::Error::Timeout("30s".into()),
            NextWorker::Summarize,
        );
        assert!(matches!(e, Error::GatewayTimeout(_)));

        let e = Error::from_gateway(recap_ai::Error::Aborted, NextWorker::Respond);
        assert!(matches!(e, Error::Cancelled));

        let e = Error::from_gateway(recap_ai::Error::EmptyResponse, NextWorker::Summarize);
        assert!(matches!(
            e,
            Error::EmptyGenerationResult {
                worker: NextWorker::Summarize
            }
        ));
    }

    #[test]
    fn test_api_errors_count_as_unavailable() {
        let e = Error::from_gateway(
            recap_ai::Error::api("http_404", "model not found"),
            NextWorker::Respond,
        );
        assert!(matches!(e, Error::GatewayUnavailable(ref m) if m.contains("model not found")));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::GatewayUnavailable("down".into()).is_retryable());
        assert!(Error::GatewayTimeout("slow".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(
            !Error::EmptyGenerationResult {
                worker: NextWorker::Respond
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_empty_generation_message_names_worker() {
        let e = Error::EmptyGenerationResult {
            worker: NextWorker::Summarize,
        };
        assert_eq!(e.to_string(), "summarize step produced an empty generation");
    }
}
