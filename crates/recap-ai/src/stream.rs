//! Streaming event types and utilities

use crate::error::Error;
use crate::types::Usage;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a completion streams in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Stream opened for the given model
    Start { model: String },
    /// Text content delta
    TextDelta { delta: String },
    /// Completion finished successfully
    Done {
        text: String,
        finish_reason: Option<String>,
        usage: Usage,
    },
    /// Error occurred
    Error {
        kind: StreamErrorKind,
        message: String,
    },
}

/// Classification of a stream failure, preserved across the event boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// Connection refused, reset, or otherwise unreachable
    Unavailable,
    /// Connect or read deadline elapsed
    Timeout,
    /// Backend answered with an error status or error payload
    Api,
    /// Malformed event data
    Protocol,
}

impl StreamErrorKind {
    /// Turn a stream failure back into a typed error
    pub fn into_error(self, message: impl Into<String>) -> Error {
        let message = message.into();
        match self {
            StreamErrorKind::Unavailable => Error::Unavailable(message),
            StreamErrorKind::Timeout => Error::Timeout(message),
            StreamErrorKind::Api => Error::api("stream_error", message),
            StreamErrorKind::Protocol => Error::Sse(message),
        }
    }
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Folds streaming events into the final completion text
#[derive(Debug, Default)]
pub struct TextAccumulator {
    text: String,
    usage: Usage,
    finished: bool,
    error: Option<(StreamErrorKind, String)>,
}

impl TextAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event
    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::Start { .. } => {}
            MessageEvent::TextDelta { delta } => self.text.push_str(delta),
            MessageEvent::Done { text, usage, .. } => {
                // Done carries the authoritative text; deltas may have been partial
                if !text.is_empty() {
                    self.text = text.clone();
                }
                self.usage = *usage;
                self.finished = true;
            }
            MessageEvent::Error { kind, message } => self.error = Some((*kind, message.clone())),
        }
    }

    /// Whether a Done event has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the reported failure as a typed error
    pub fn take_error(&mut self) -> Option<Error> {
        self.error
            .take()
            .map(|(kind, message)| kind.into_error(message))
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Usage reported by the Done event
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Consume the accumulator, returning the text
    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_deltas() {
        let mut acc = TextAccumulator::new();
        acc.process_event(&MessageEvent::Start {
            model: "qwen3-4b".into(),
        });
        acc.process_event(&MessageEvent::TextDelta {
            delta: "Hello".into(),
        });
        acc.process_event(&MessageEvent::TextDelta {
            delta: ", world".into(),
        });
        assert_eq!(acc.text(), "Hello, world");
        assert!(!acc.is_finished());
    }

    #[test]
    fn test_done_text_wins() {
        let mut acc = TextAccumulator::new();
        acc.process_event(&MessageEvent::TextDelta { delta: "Hel".into() });
        acc.process_event(&MessageEvent::Done {
            text: "Hello".into(),
            finish_reason: Some("stop".into()),
            usage: Usage { input: 12, output: 2 },
        });
        assert!(acc.is_finished());
        assert_eq!(acc.usage().output, 2);
        assert_eq!(acc.into_text(), "Hello");
    }

    #[test]
    fn test_error_is_recorded() {
        let mut acc = TextAccumulator::new();
        acc.process_event(&MessageEvent::Error {
            kind: StreamErrorKind::Timeout,
            message: "read timed out".into(),
        });
        assert!(matches!(acc.take_error(), Some(Error::Timeout(ref m)) if m == "read timed out"));
        assert!(acc.take_error().is_none());
    }

    #[test]
    fn test_error_kind_mapping() {
        assert!(matches!(
            StreamErrorKind::Unavailable.into_error("refused"),
            Error::Unavailable(_)
        ));
        assert!(matches!(
            StreamErrorKind::Protocol.into_error("bad chunk"),
            Error::Sse(_)
        ));
        let terminal = MessageEvent::Error {
            kind: StreamErrorKind::Api,
            message: String::new(),
        };
        assert!(terminal.is_terminal());
    }
}
