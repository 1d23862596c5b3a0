//! Render buffer and flush policy
//!
//! Fast token arrival is batched into fewer UI updates; slow arrival is
//! bounded by an idle deadline so text never lingers unseen.

use std::time::Duration;

use tokio::time::Instant;

const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush immediately once the buffer holds more chars than this.
    pub max_chars: usize,
    /// Flush after this long without new data.
    pub idle: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            max_chars: 100,
            idle: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    FlushNow,
    FlushAt(Instant),
}

/// Text received but not yet applied to the conversation, plus the single
/// pending idle deadline.
#[derive(Debug)]
pub struct RenderBuffer {
    policy: FlushPolicy,
    text: String,
    chars: usize,
    deadline: Option<Instant>,
}

impl RenderBuffer {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            text: String::new(),
            chars: 0,
            deadline: None,
        }
    }

    /// Append `text`, cancelling any pending deadline, and decide when to
    /// flush.
    pub fn push(&mut self, text: &str, now: Instant) -> Decision {
        self.text.push_str(text);
        self.chars += text.chars().count();
        self.deadline = None;

        if self.text.contains(PARAGRAPH_BREAK) || self.chars > self.policy.max_chars {
            Decision::FlushNow
        } else {
            let at = now + self.policy.idle;
            self.deadline = Some(at);
            Decision::FlushAt(at)
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the buffered text and cancel the deadline.
    pub fn take(&mut self) -> Option<String> {
        self.deadline = None;
        self.chars = 0;
        if self.text.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_waits_for_idle() {
        let now = Instant::now();
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        assert_eq!(
            buffer.push("hi", now),
            Decision::FlushAt(now + Duration::from_millis(50))
        );
        assert_eq!(buffer.deadline(), Some(now + Duration::from_millis(50)));
    }

    #[test]
    fn test_new_data_rearms_deadline() {
        let now = Instant::now();
        let later = now + Duration::from_millis(30);
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        buffer.push("a", now);
        buffer.push("b", later);
        assert_eq!(buffer.deadline(), Some(later + Duration::from_millis(50)));
    }

    #[test]
    fn test_paragraph_break_flushes_now() {
        let now = Instant::now();
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        assert_eq!(buffer.push("foo\n\nbar", now), Decision::FlushNow);
        assert!(buffer.deadline().is_none());

        // A break split across two appends still counts.
        buffer.take();
        buffer.push("end\n", now);
        assert_eq!(buffer.push("\nnext", now), Decision::FlushNow);
    }

    #[test]
    fn test_length_threshold() {
        let now = Instant::now();
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        assert!(matches!(buffer.push(&"x".repeat(100), now), Decision::FlushAt(_)));
        assert_eq!(buffer.push("y", now), Decision::FlushNow);

        buffer.take();
        assert_eq!(buffer.push(&"z".repeat(101), now), Decision::FlushNow);
    }

    #[test]
    fn test_length_counts_chars() {
        let now = Instant::now();
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        // 100 chars, 300 bytes.
        assert!(matches!(buffer.push(&"日".repeat(100), now), Decision::FlushAt(_)));
    }

    #[test]
    fn test_take_clears() {
        let now = Instant::now();
        let mut buffer = RenderBuffer::new(FlushPolicy::default());

        buffer.push("hi", now);
        assert_eq!(buffer.take().as_deref(), Some("hi"));
        assert!(buffer.is_empty());
        assert!(buffer.deadline().is_none());
        assert_eq!(buffer.take(), None);
    }
}
