//! Turn event types

use serde::{Deserialize, Serialize};

use crate::router::NextWorker;

/// Events emitted by the executor while a turn runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A turn started; `step_count` is the counter after the input was applied
    TurnStart { chat_id: String, step_count: u64 },

    /// The router picked the next worker
    Routed { chat_id: String, next: NextWorker },

    /// History compression started
    SummaryStart { chat_id: String, messages: usize },

    /// History compression finished
    SummaryEnd { chat_id: String, summary_chars: usize },

    /// The assistant reply arrived
    ResponseEnd { chat_id: String, reply_chars: usize },

    /// The turn completed
    TurnEnd {
        chat_id: String,
        step_count: u64,
        message_count: usize,
        summarized: bool,
    },

    /// The turn was aborted; the caller's prior state is still current
    TurnFailed { chat_id: String, message: String },
}

impl TurnEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::TurnEnd { .. } | TurnEvent::TurnFailed { .. })
    }

    /// The conversation this event belongs to
    pub fn chat_id(&self) -> &str {
        match self {
            TurnEvent::TurnStart { chat_id, .. }
            | TurnEvent::Routed { chat_id, .. }
            | TurnEvent::SummaryStart { chat_id, .. }
            | TurnEvent::SummaryEnd { chat_id, .. }
            | TurnEvent::ResponseEnd { chat_id, .. }
            | TurnEvent::TurnEnd { chat_id, .. }
            | TurnEvent::TurnFailed { chat_id, .. } => chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag() {
        let event = TurnEvent::Routed {
            chat_id: "c".into(),
            next: NextWorker::Summarize,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "routed");
        assert_eq!(json["next"], "summarize");
        assert_eq!(event.chat_id(), "c");
        assert!(!event.is_terminal());
    }
}
