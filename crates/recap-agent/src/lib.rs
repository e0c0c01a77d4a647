//! recap-agent: Turn executor with periodic history compression
//!
//! Each turn appends the user's message, routes on the step counter, runs
//! the summarizer on the cheap model every `threshold` turns, then answers
//! on the capable model. State is a plain value threaded between turns by
//! the caller.

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod responder;
pub mod router;
pub mod state;
pub mod summarizer;

#[cfg(test)]
mod testing;

pub use config::TurnConfig;
pub use error::{Error, Result};
pub use events::TurnEvent;
pub use executor::TurnExecutor;
pub use responder::Responder;
pub use router::{NextWorker, Router};
pub use state::{ConversationState, StateUpdate};
pub use summarizer::Summarizer;
