//! Stream consumer
//!
//! Sends the conversation to the relay and folds the streamed answer into
//! the in-progress assistant turn:
//!
//! 1. Read the response body chunk by chunk
//! 2. Decode UTF-8, carrying split characters across chunks
//! 3. Decode tagged fragment lines, carrying split lines across chunks
//! 4. Buffer the text and flush it into the turn on the pacing policy
//! 5. Finalize: last flush, cancel the timer, clear the in-progress marker

pub mod buffer;
pub mod decoder;
pub mod session;
pub mod terminal;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::time::{self, Instant};

use crate::conversation::{Conversation, Turn, TurnId};
use crate::relay::fragment::{FragmentDecoder, FragmentError};

pub use buffer::FlushPolicy;
pub use session::{NoopSink, RenderSession, RenderSink};

use decoder::Utf8Decoder;

/// Errors while streaming an answer
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Relay returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Relay response has no body")]
    MissingBody,

    #[error("No assistant turn is in progress")]
    NoPlaceholder,

    #[error(transparent)]
    Fragment(#[from] FragmentError),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Turn],
}

/// Drive one streamed answer into the turn `target`.
///
/// The session is torn down on every exit path, so an error still applies
/// whatever text arrived and clears the in-progress marker.
pub async fn consume<S, E>(
    conversation: &mut Conversation,
    target: TurnId,
    mut body: S,
    policy: FlushPolicy,
    sink: &mut dyn RenderSink,
) -> Result<(), ClientError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ClientError>,
{
    let mut session = RenderSession::new(conversation, target, policy, sink);
    let mut utf8 = Utf8Decoder::default();
    let mut fragments = FragmentDecoder::default();

    loop {
        let deadline = session.deadline();
        tokio::select! {
            chunk = body.next() => {
                let Some(chunk) = chunk else {
                    break;
                };
                let chunk = chunk.map_err(Into::into)?;
                fragments.feed(&utf8.decode(&chunk));
                let mut text = String::new();
                let drained = fragments.drain_into(&mut text);
                session.push(&text);
                drained?;
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.flush();
            }
        }
    }

    fragments.feed(&utf8.finish());
    let mut text = String::new();
    let finished = fragments.finish_into(&mut text);
    session.push(&text);
    finished?;
    session.finish();
    Ok(())
}

/// HTTP client for the relay's chat endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    policy: FlushPolicy,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            policy: FlushPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stream the answer for the conversation's in-progress turn.
    ///
    /// On failure the error is logged and returned, and the in-progress
    /// marker is cleared so the partial answer stays readable.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        sink: &mut dyn RenderSink,
    ) -> Result<(), ClientError> {
        let result = self.stream_answer(conversation, sink).await;
        if let Err(err) = &result {
            tracing::error!(%err, "error processing message stream");
            conversation.clear_in_progress();
        }
        result
    }

    async fn stream_answer(
        &self,
        conversation: &mut Conversation,
        sink: &mut dyn RenderSink,
    ) -> Result<(), ClientError> {
        let target = conversation
            .in_progress()
            .and_then(|turn| turn.id)
            .ok_or(ClientError::NoPlaceholder)?;

        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest {
                messages: conversation.turns(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        if response.content_length() == Some(0) {
            return Err(ClientError::MissingBody);
        }

        let body = std::pin::pin!(response.bytes_stream());
        consume(conversation, target, body, self.policy, sink).await
    }
}
