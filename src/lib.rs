//! Sonic - streaming chat relay
//!
//! Forwards a conversation to an OpenAI-compatible completions API and
//! relays the generated tokens back as they arrive. The client side folds
//! the stream into the in-progress assistant turn with paced updates.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod conversation;
pub mod providers;
pub mod relay;
pub mod routes;

use conversation::Turn;
use providers::OpenAICompatProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<OpenAICompatProvider>,
    /// Fixed instruction prepended to every upstream request.
    pub instruction: Arc<Turn>,
}
