//! Answers the latest user message on the capable model

use recap_ai::{ChatMessage, GenerateRequest, InferenceGateway, ModelRole};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    router::NextWorker,
    state::{ConversationState, StateUpdate},
};

/// Heading placed ahead of the summary in the system entry
pub const SUMMARY_PREAMBLE: &str = "Summary of the conversation so far:";

/// Worker that runs on the capable model
#[derive(Debug, Clone)]
pub struct Responder {
    model: String,
}

impl Responder {
    /// Create a responder using `model` for the capable role
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// The model this worker asks for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the prompt.
    ///
    /// With a summary: the summary as a system entry plus the latest message,
    /// nothing else. Without one: the whole raw log.
    pub fn build_request(&self, state: &ConversationState) -> GenerateRequest {
        let messages = if state.has_summary() {
            let mut prompt = Vec::with_capacity(2);
            prompt.push(ChatMessage::system(format!(
                "{}\n{}",
                SUMMARY_PREAMBLE, state.summary_context
            )));
            prompt.extend(state.last_message().cloned());
            prompt
        } else {
            state.messages.clone()
        };

        GenerateRequest::new(ModelRole::Capable, self.model.clone(), messages)
    }

    /// Produce the assistant reply and a `+1` counter delta
    pub async fn respond(
        &self,
        gateway: &dyn InferenceGateway,
        state: &ConversationState,
        cancel: CancellationToken,
    ) -> Result<StateUpdate> {
        let request = self.build_request(state);
        tracing::debug!(
            chat_id = %state.chat_id,
            prompt_messages = request.messages.len(),
            history_messages = state.messages.len(),
            summarized = state.has_summary(),
            "Requesting reply"
        );

        let reply = gateway
            .generate(&request, cancel)
            .await
            .map_err(|e| Error::from_gateway(e, NextWorker::Respond))?;

        if reply.trim().is_empty() {
            return Err(Error::EmptyGenerationResult {
                worker: NextWorker::Respond,
            });
        }

        Ok(StateUpdate::new()
            .with_message(ChatMessage::assistant(reply))
            .with_step_delta(1))
    }
}
