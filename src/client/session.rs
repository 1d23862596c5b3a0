//! Per-message render session
//!
//! Owns the render buffer and idle deadline for the one assistant turn that
//! is streaming. Dropping the session tears it down: buffered text is
//! flushed, the deadline cancelled, and the in-progress marker cleared.

use tokio::time::Instant;

use crate::conversation::{Conversation, Turn, TurnId};

use super::buffer::{Decision, FlushPolicy, RenderBuffer};

/// Receives every update applied to the conversation.
pub trait RenderSink {
    /// `text` was appended to `turn`.
    fn flushed(&mut self, turn: &Turn, text: &str);

    /// The stream for this exchange is over.
    fn finished(&mut self, _conversation: &Conversation) {}
}

/// Sink that ignores updates.
#[derive(Debug, Default)]
pub struct NoopSink;

impl RenderSink for NoopSink {
    fn flushed(&mut self, _turn: &Turn, _text: &str) {}
}

pub struct RenderSession<'a, K: RenderSink + ?Sized> {
    conversation: &'a mut Conversation,
    target: TurnId,
    buffer: RenderBuffer,
    sink: &'a mut K,
    finished: bool,
}

impl<'a, K: RenderSink + ?Sized> RenderSession<'a, K> {
    pub fn new(
        conversation: &'a mut Conversation,
        target: TurnId,
        policy: FlushPolicy,
        sink: &'a mut K,
    ) -> Self {
        Self {
            conversation,
            target,
            buffer: RenderBuffer::new(policy),
            sink,
            finished: false,
        }
    }

    /// Pending idle deadline, if a flush is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.buffer.deadline()
    }

    pub fn push(&mut self, text: &str) {
        if text.is_empty() || self.finished {
            return;
        }
        if self.buffer.push(text, Instant::now()) == Decision::FlushNow {
            self.flush();
        }
    }

    /// Apply the buffered text to the target turn.
    pub fn flush(&mut self) {
        let Some(text) = self.buffer.take() else {
            return;
        };
        if !self.conversation.append(self.target, &text) {
            tracing::warn!(turn = self.target, "streaming turn vanished, dropping text");
            return;
        }
        if let Some(turn) = self.conversation.get(self.target) {
            self.sink.flushed(turn, &text);
        }
    }

    /// Final flush, cancel the deadline, and clear the in-progress marker on
    /// every turn. Later calls do nothing.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.flush();
        self.finished = true;
        self.conversation.clear_in_progress();
        self.sink.finished(&*self.conversation);
    }

    pub fn conversation(&self) -> &Conversation {
        &*self.conversation
    }
}

impl<K: RenderSink + ?Sized> Drop for RenderSession<'_, K> {
    fn drop(&mut self) {
        self.finish();
    }
}
