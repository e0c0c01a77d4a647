//! Condenses the raw chat log into a replacement summary

use recap_ai::{ChatMessage, GenerateRequest, InferenceGateway, ModelRole};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    router::NextWorker,
    state::{ConversationState, StateUpdate},
};

/// Instruction placed ahead of the full history
pub const SUMMARIZATION_INSTRUCTION: &str = "\
Condense the following conversation history into a short paragraph. \
Retain all key facts, names, numbers, decisions and any instructions the user gave, \
so that the conversation can continue from the summary alone. \
Reply with the summary only.";

/// Worker that runs on the cheap model
#[derive(Debug, Clone)]
pub struct Summarizer {
    model: String,
}

impl Summarizer {
    /// Create a summarizer using `model` for the cheap role
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// The model this worker asks for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Instruction followed by every message in the log, untruncated
    pub fn build_request(&self, state: &ConversationState) -> GenerateRequest {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(ChatMessage::system(SUMMARIZATION_INSTRUCTION));
        messages.extend(state.messages.iter().cloned());
        GenerateRequest::new(ModelRole::Cheap, self.model.clone(), messages)
    }

    /// Produce a new summary and the delta that resets the counter to zero.
    ///
    /// On failure nothing is returned, so the counter stays where it was and
    /// the next turn routes here again.
    pub async fn summarize(
        &self,
        gateway: &dyn InferenceGateway,
        state: &ConversationState,
        cancel: CancellationToken,
    ) -> Result<StateUpdate> {
        let request = self.build_request(state);
        tracing::info!(
            chat_id = %state.chat_id,
            messages = state.messages.len(),
            step_count = state.step_count,
            "Compressing conversation history"
        );

        let summary = gateway
            .generate(&request, cancel)
            .await
            .map_err(|e| Error::from_gateway(e, NextWorker::Summarize))?;

        if summary.trim().is_empty() {
            return Err(Error::EmptyGenerationResult {
                worker: NextWorker::Summarize,
            });
        }

        tracing::debug!(
            chat_id = %state.chat_id,
            summary_chars = summary.len(),
            "Summary produced"
        );

        Ok(StateUpdate::new()
            .with_summary(summary)
            .with_step_delta(-signed_count(state.step_count)))
    }
}

fn signed_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use recap_ai::Role;

    fn history(step_count: u64) -> ConversationState {
        let mut state = ConversationState::new("chat-9");
        state.step_count = step_count;
        for i in 0..4 {
            state.messages.push(ChatMessage::user(format!("question {}", i)));
            state.messages.push(ChatMessage::assistant(format!("answer {}", i)));
        }
        state.messages.push(ChatMessage::user("question 4"));
        state
    }

    #[test]
    fn test_request_prefixes_instruction_to_full_history() {
        let summarizer = Summarizer::new("qwen3-4b:latest");
        let state = history(5);
        let request = summarizer.build_request(&state);

        assert_eq!(request.role, ModelRole::Cheap);
        assert_eq!(request.model, "qwen3-4b:latest");
        assert_eq!(request.messages.len(), state.messages.len() + 1);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, SUMMARIZATION_INSTRUCTION);
        assert_eq!(&request.messages[1..], state.messages.as_slice());
    }

    #[tokio::test]
    async fn test_summarize_returns_summary_and_reset() {
        let gateway = MockGateway::replying(&["User is asking numbered questions."]);
        let state = history(5);

        let update = Summarizer::new("small")
            .summarize(&gateway, &state, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            update.summary_context.as_deref(),
            Some("User is asking numbered questions.")
        );
        assert_eq!(update.step_count, Some(-5));
        assert!(update.messages.is_none(), "summarizer never touches the log");
        assert_eq!(state.apply(update).step_count, 0);
    }

    #[tokio::test]
    async fn test_reset_matches_any_count() {
        let gateway = MockGateway::replying(&["s"]);
        let state = history(15);
        let update = Summarizer::new("small")
            .summarize(&gateway, &state, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(update.step_count, Some(-15));
    }

    #[tokio::test]
    async fn test_summary_kept_verbatim() {
        let text = "  Facts: likes Rust.\nWants short answers.  ";
        let gateway = MockGateway::replying(&[text]);
        let update = Summarizer::new("small")
            .summarize(&gateway, &history(5), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(update.summary_context.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn test_blank_summary_is_error() {
        let gateway = MockGateway::replying(&["   \n"]);
        let err = Summarizer::new("small")
            .summarize(&gateway, &history(5), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyGenerationResult {
                worker: NextWorker::Summarize
            }
        ));
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let gateway =
            MockGateway::new(vec![Err(recap_ai::Error::Unavailable("connection refused".into()))]);
        let err = Summarizer::new("small")
            .summarize(&gateway, &history(5), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GatewayUnavailable(_)));
    }
}
