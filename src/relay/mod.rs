//! Streaming relay
//!
//! Turns the upstream SSE byte stream into tagged-line fragments. Each
//! upstream frame produces at most one write, emitted as soon as the frame
//! is complete.

pub mod fragment;
pub mod sse;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::conversation::Turn;
use crate::providers::openai_compat::ChatCompletionChunk;

use sse::SseFrame;

/// Prompt sent upstream: the fixed instruction followed by the client's
/// turns, as supplied.
pub fn upstream_turns(instruction: &Turn, turns: &[Turn]) -> Vec<Turn> {
    std::iter::once(instruction).chain(turns).cloned().collect()
}

/// Re-encode an upstream completion stream. Transport errors pass through
/// and end the relay; malformed frames are logged and skipped.
pub fn relay<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::try_stream! {
        let mut frames = std::pin::pin!(sse::frames(upstream));
        let mut deltas = 0usize;
        let mut done = false;

        while let Some(frame) = frames.next().await {
            match frame? {
                SseFrame::Done => {
                    done = true;
                    break;
                }
                SseFrame::Data(payload) => {
                    if let Some(bytes) = translate(&payload) {
                        deltas += 1;
                        yield bytes;
                    }
                }
            }
        }

        if !done {
            tracing::debug!("upstream closed without [DONE]");
        }
        tracing::debug!(deltas, "relay finished");
    }
}

/// Map one `data:` payload to the bytes written downstream.
fn translate(payload: &str) -> Option<Bytes> {
    let chunk: ChatCompletionChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::warn!(%err, %payload, "skipping malformed upstream frame");
            return None;
        }
    };

    if let Some(error) = &chunk.error {
        tracing::warn!(message = %error.message, kind = ?error.error_type, "upstream sent an error frame");
        return None;
    }

    if let Some(reason) = chunk.finish_reason() {
        tracing::debug!(reason, "upstream finished generating");
    }

    chunk.delta_text().map(fragment::encode_delta)
}
