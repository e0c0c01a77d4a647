//! Scripted gateway shared by the worker and executor tests

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use recap_ai::{GenerateRequest, InferenceGateway};
use tokio_util::sync::CancellationToken;

/// Replays scripted results and records every request it receives.
#[derive(Default)]
pub(crate) struct MockGateway {
    responses: Mutex<VecDeque<recap_ai::Result<String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    /// Block until cancelled instead of answering
    hang: bool,
}

impl MockGateway {
    pub(crate) fn new(responses: Vec<recap_ai::Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub(crate) fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
    ) -> recap_ai::Result<String> {
        self.requests.lock().push(request.clone());
        if self.hang {
            cancel.cancelled().await;
            return Err(recap_ai::Error::Aborted);
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("default reply".to_string()))
    }
}
