//! Interactive terminal chat against a running relay

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::conversation::{Conversation, Turn};

use super::{ChatClient, FlushPolicy, RenderSink};

/// Prints flushed text as it lands.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl RenderSink for TerminalSink {
    fn flushed(&mut self, _turn: &Turn, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = write_text(&mut stdout, text) {
            tracing::debug!(%err, "failed to write to terminal");
        }
    }

    fn finished(&mut self, _conversation: &Conversation) {
        println!("\n");
    }
}

fn write_text(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

pub async fn run(url: &str, policy: FlushPolicy) -> anyhow::Result<()> {
    let client = ChatClient::new(url).with_policy(policy);
    let mut conversation = Conversation::new();
    let mut sink = TerminalSink;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Connected to {url}. Type a message, or /quit to exit.\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        conversation.begin_exchange(input);
        if let Err(err) = client.send(&mut conversation, &mut sink).await {
            eprintln!("\n[error] {err}\n");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_text() {
        let mut out = Vec::new();
        write_text(&mut out, "Hello!").unwrap();
        assert_eq!(out, b"Hello!");

        let err = write_text(&mut BrokenPipe, "Hello!").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
