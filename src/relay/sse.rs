//! Upstream SSE framing
//!
//! Event parsing is left to `eventsource-stream`, which holds partial lines
//! and split UTF-8 sequences until the rest of them arrives.

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{stream, Stream, StreamExt};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` event.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Frame an upstream body into data events. Events without a payload
/// (keep-alives, comments, bare `event:` fields) are skipped.
///
/// A blank line is appended once upstream closes, so an event left
/// unterminated on the last chunk is still dispatched.
pub fn frames<S, E>(upstream: S) -> impl Stream<Item = Result<SseFrame, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let terminator = stream::once(async { Ok(Bytes::from_static(b"\n\n")) });

    upstream
        .chain(terminator)
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) => parse_data(&event.data).map(Ok),
                Err(EventStreamError::Transport(err)) => Some(Err(err)),
                Err(EventStreamError::Utf8(err)) => {
                    tracing::warn!(%err, "skipping upstream event with invalid UTF-8");
                    None
                }
                Err(EventStreamError::Parser(err)) => {
                    tracing::warn!(?err, "skipping unparseable upstream event");
                    None
                }
            }
        })
}

fn parse_data(data: &str) -> Option<SseFrame> {
    match data.trim() {
        "" => None,
        DONE_SENTINEL => Some(SseFrame::Done),
        payload => Some(SseFrame::Data(payload.to_string())),
    }
}
