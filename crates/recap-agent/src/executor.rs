//! The turn executor: route, optionally compress, then answer

use std::future::Future;
use std::sync::Arc;

use recap_ai::{ChatMessage, InferenceGateway};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    config::TurnConfig,
    error::{Error, Result},
    events::TurnEvent,
    responder::Responder,
    router::{NextWorker, Router},
    state::{ConversationState, StateUpdate},
    summarizer::Summarizer,
};

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Route,
    Summarize,
    Respond,
}

/// Drives one turn at a time against a shared gateway.
///
/// Built once per process; holds no per-conversation state, so one executor
/// can serve any number of conversations concurrently.
pub struct TurnExecutor {
    config: TurnConfig,
    router: Router,
    summarizer: Summarizer,
    responder: Responder,
    gateway: Arc<dyn InferenceGateway>,
    event_tx: broadcast::Sender<TurnEvent>,
}

impl TurnExecutor {
    /// Create an executor with fixed worker bindings
    pub fn new(config: TurnConfig, gateway: Arc<dyn InferenceGateway>) -> Result<Self> {
        config.validate()?;
        let router = Router::from_config(&config)?;
        let summarizer = Summarizer::new(config.cheap_model_id.clone());
        let responder = Responder::new(config.capable_model_id.clone());
        let (event_tx, _) = broadcast::channel(256);

        Ok(Self {
            config,
            router,
            summarizer,
            responder,
            gateway,
            event_tx,
        })
    }

    /// Subscribe to turn events
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.event_tx.subscribe()
    }

    /// Get the executor config
    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Get the router
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The partial update a new user message contributes to a turn
    pub fn input_update(chat_id: &str, user_message: &str) -> StateUpdate {
        StateUpdate::new()
            .with_message(ChatMessage::user(user_message))
            .with_chat_id(chat_id)
    }

    /// Run one turn.
    ///
    /// `prior` is the state returned by the previous successful turn, or `None`
    /// for a new conversation. It is never modified: on error it remains the
    /// valid point to resume from.
    pub async fn run_turn(
        &self,
        chat_id: &str,
        prior: Option<&ConversationState>,
        user_message: &str,
    ) -> Result<ConversationState> {
        self.run_turn_with_cancel(chat_id, prior, user_message, CancellationToken::new())
            .await
    }

    /// Run one turn, aborting as soon as `cancel` fires
    pub async fn run_turn_with_cancel(
        &self,
        chat_id: &str,
        prior: Option<&ConversationState>,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Result<ConversationState> {
        let base = match prior {
            Some(state) => {
                if state.chat_id != chat_id {
                    tracing::warn!(
                        prior = %state.chat_id,
                        chat_id,
                        "Prior state belongs to a different chat id; replacing it"
                    );
                }
                state.clone()
            }
            None => ConversationState::new(chat_id),
        };

        let working = base.apply(Self::input_update(chat_id, user_message));
        let _ = self.event_tx.send(TurnEvent::TurnStart {
            chat_id: chat_id.to_string(),
            step_count: working.step_count,
        });

        match self.drive(working, &cancel).await {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Turn aborted");
                let _ = self.event_tx.send(TurnEvent::TurnFailed {
                    chat_id: chat_id.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        mut state: ConversationState,
        cancel: &CancellationToken,
    ) -> Result<ConversationState> {
        let mut phase = Phase::Route;
        let mut summarized = false;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            phase = match phase {
                Phase::Route => {
                    let next = self.router.route(&state);
                    tracing::debug!(
                        chat_id = %state.chat_id,
                        step_count = state.step_count,
                        %next,
                        "Routed"
                    );
                    let _ = self.event_tx.send(TurnEvent::Routed {
                        chat_id: state.chat_id.clone(),
                        next,
                    });
                    match next {
                        NextWorker::Summarize => Phase::Summarize,
                        NextWorker::Respond => Phase::Respond,
                    }
                }
                Phase::Summarize => {
                    let _ = self.event_tx.send(TurnEvent::SummaryStart {
                        chat_id: state.chat_id.clone(),
                        messages: state.messages.len(),
                    });

                    let update = guarded(
                        cancel,
                        self.summarizer
                            .summarize(self.gateway.as_ref(), &state, cancel.clone()),
                    )
                    .await?;
                    let summary_chars = update.summary_context.as_ref().map_or(0, String::len);
                    state.apply_in_place(update);
                    summarized = true;

                    let _ = self.event_tx.send(TurnEvent::SummaryEnd {
                        chat_id: state.chat_id.clone(),
                        summary_chars,
                    });
                    // Compression never ends a turn
                    Phase::Respond
                }
                Phase::Respond => {
                    let update = guarded(
                        cancel,
                        self.responder
                            .respond(self.gateway.as_ref(), &state, cancel.clone()),
                    )
                    .await?;
                    let reply_chars = update
                        .messages
                        .as_ref()
                        .and_then(|m| m.last())
                        .map_or(0, |m| m.content.len());
                    state.apply_in_place(update);

                    let _ = self.event_tx.send(TurnEvent::ResponseEnd {
                        chat_id: state.chat_id.clone(),
                        reply_chars,
                    });
                    let _ = self.event_tx.send(TurnEvent::TurnEnd {
                        chat_id: state.chat_id.clone(),
                        step_count: state.step_count,
                        message_count: state.messages.len(),
                        summarized,
                    });
                    return Ok(state);
                }
            };
        }
    }
}

/// Race a worker against cancellation so a gateway that ignores the token
/// still cannot hold the turn open.
async fn guarded<F>(cancel: &CancellationToken, worker: F) -> Result<StateUpdate>
where
    F: Future<Output = Result<StateUpdate>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = worker => result,
    }
}
