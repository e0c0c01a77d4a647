//! Conversation state and the per-field reducer that merges partial updates.
//!
//! Every field of [`ConversationState`] has exactly one reduction policy,
//! declared in [`FIELD_REDUCERS`]. Workers never mutate state directly: they
//! return a [`StateUpdate`] touching a subset of fields, and the executor folds
//! it in with [`ConversationState::apply`].

use recap_ai::ChatMessage;
use serde::{Deserialize, Serialize};

/// The record threaded through a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Raw chat log in chronological order; append-only
    pub messages: Vec<ChatMessage>,
    /// Latest condensed view of the history, empty until the first compression
    #[serde(default)]
    pub summary_context: String,
    /// Turns since the last compression (or since the start)
    pub step_count: u64,
    /// Opaque conversation identifier, used only for correlation
    pub chat_id: String,
}

impl ConversationState {
    /// Seed state for a brand-new conversation
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            summary_context: String::new(),
            step_count: 1,
            chat_id: chat_id.into(),
        }
    }

    /// Whether a compression has produced a summary yet
    pub fn has_summary(&self) -> bool {
        !self.summary_context.is_empty()
    }

    /// The most recent entry in the chat log
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Produce the state that results from merging `update` into `self`
    pub fn apply(&self, update: StateUpdate) -> Self {
        let mut next = self.clone();
        next.apply_in_place(update);
        next
    }

    /// Merge `update` into `self` field by field
    pub fn apply_in_place(&mut self, mut update: StateUpdate) {
        for reducer in FIELD_REDUCERS {
            (reducer.reduce)(self, &mut update);
        }
    }
}

/// A partial update: any subset of the state's fields.
///
/// `step_count` is a signed delta, not an absolute value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl StateUpdate {
    /// An update that touches nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Append these messages
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Append a single message
    pub fn with_message(self, message: ChatMessage) -> Self {
        self.with_messages(vec![message])
    }

    /// Replace the summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary_context = Some(summary.into());
        self
    }

    /// Add `delta` to the turn counter
    pub fn with_step_delta(mut self, delta: i64) -> Self {
        self.step_count = Some(delta);
        self
    }

    /// Replace the chat id
    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.messages.is_none()
            && self.summary_context.is_none()
            && self.step_count.is_none()
            && self.chat_id.is_none()
    }

    /// Combine with a later update using the same per-field policies.
    ///
    /// Applying the result equals applying `self` then `later` as long as the
    /// counter does not pass below zero after `self`. Step deltas are summed
    /// before they reach the state, so a clamp that sequential application
    /// would hit in between is not reproduced. The workers never emit such a
    /// pair: a reset is exactly `-step_count`.
    pub fn merge(mut self, mut later: StateUpdate) -> StateUpdate {
        for reducer in FIELD_REDUCERS {
            (reducer.combine)(&mut self, &mut later);
        }
        self
    }
}

/// How a field absorbs a new value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Concatenate onto the existing sequence
    Append,
    /// Add numerically to the existing value
    Accumulate,
    /// Overwrite the existing value
    Replace,
}

/// State fields covered by the reducer table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Messages,
    SummaryContext,
    StepCount,
    ChatId,
}

/// One row of the reducer table
pub struct FieldReducer {
    pub field: Field,
    pub policy: Reduction,
    reduce: fn(&mut ConversationState, &mut StateUpdate),
    combine: fn(&mut StateUpdate, &mut StateUpdate),
}

/// The reducer table: every state field and the policy that merges it
pub const FIELD_REDUCERS: &[FieldReducer] = &[
    FieldReducer {
        field: Field::Messages,
        policy: Reduction::Append,
        reduce: |state, update| {
            if let Some(new) = update.messages.take() {
                append(&mut state.messages, new);
            }
        },
        combine: |earlier, later| {
            earlier.messages = combine_append(earlier.messages.take(), later.messages.take());
        },
    },
    FieldReducer {
        field: Field::SummaryContext,
        policy: Reduction::Replace,
        reduce: |state, update| {
            if let Some(new) = update.summary_context.take() {
                replace(&mut state.summary_context, new);
            }
        },
        combine: |earlier, later| {
            earlier.summary_context =
                combine_replace(earlier.summary_context.take(), later.summary_context.take());
        },
    },
    FieldReducer {
        field: Field::StepCount,
        policy: Reduction::Accumulate,
        reduce: |state, update| {
            if let Some(delta) = update.step_count.take() {
                accumulate(&mut state.step_count, delta);
            }
        },
        combine: |earlier, later| {
            earlier.step_count =
                combine_accumulate(earlier.step_count.take(), later.step_count.take());
        },
    },
    FieldReducer {
        field: Field::ChatId,
        policy: Reduction::Replace,
        reduce: |state, update| {
            if let Some(new) = update.chat_id.take() {
                replace(&mut state.chat_id, new);
            }
        },
        combine: |earlier, later| {
            earlier.chat_id = combine_replace(earlier.chat_id.take(), later.chat_id.take());
        },
    },
];

fn append<T>(current: &mut Vec<T>, new: Vec<T>) {
    current.extend(new);
}

// Saturates at zero so a stale reset delta can never drive the counter negative
fn accumulate(current: &mut u64, delta: i64) {
    *current = current.saturating_add_signed(delta);
}

fn replace<T>(current: &mut T, new: T) {
    *current = new;
}

fn combine_append<T>(earlier: Option<Vec<T>>, later: Option<Vec<T>>) -> Option<Vec<T>> {
    match (earlier, later) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
        (a, b) => a.or(b),
    }
}

fn combine_accumulate(earlier: Option<i64>, later: Option<i64>) -> Option<i64> {
    match (earlier, later) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}

fn combine_replace<T>(earlier: Option<T>, later: Option<T>) -> Option<T> {
    later.or(earlier)
}
