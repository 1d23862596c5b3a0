//! Tagged-line fragment codec
//!
//! Each fragment travels as `0:<json string>\n`. JSON escaping keeps embedded
//! newlines and quotes inside one line, so the reader can delimit fragments
//! no matter how the transport re-chunks the body.

use bytes::{BufMut, Bytes, BytesMut};
use once_cell::sync::Lazy;
use regex::Regex;

const TEXT_TAG: &str = "0:";

/// Word runs, whitespace runs, or any single other character. Every char
/// falls in exactly one class, so the matches tile the input.
static FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|\s+|[^\w\s]").expect("fragment pattern is valid"));

/// Split a delta into fragments whose concatenation is the delta itself.
pub fn split(delta: &str) -> impl Iterator<Item = &str> {
    FRAGMENT.find_iter(delta).map(|m| m.as_str())
}

/// Encode every fragment of `delta` into one write.
pub fn encode_delta(delta: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(delta.len() * 2);
    for fragment in split(delta) {
        encode_into(fragment, &mut out);
    }
    out.freeze()
}

fn encode_into(fragment: &str, out: &mut BytesMut) {
    out.put_slice(TEXT_TAG.as_bytes());
    // Serializing a &str to JSON cannot fail.
    let quoted = serde_json::to_string(fragment).unwrap_or_default();
    out.put_slice(quoted.as_bytes());
    out.put_u8(b'\n');
}

#[derive(Debug, thiserror::Error)]
#[error("Malformed fragment line {line:?}: {source}")]
pub struct FragmentError {
    line: String,
    #[source]
    source: serde_json::Error,
}

/// Incremental reader for the tagged-line encoding. Partial lines are held
/// until their terminating newline arrives.
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    pending: String,
}

impl FragmentDecoder {
    pub fn feed(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Decode all complete lines buffered so far, in order.
    pub fn drain(&mut self) -> Result<String, FragmentError> {
        let mut text = String::new();
        self.drain_into(&mut text)?;
        Ok(text)
    }

    /// Like [`drain`](Self::drain), but appends to `out`. Lines decoded
    /// before a malformed one stay in `out` when the error is returned.
    pub fn drain_into(&mut self, out: &mut String) -> Result<(), FragmentError> {
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            decode_line(line.trim_end_matches(['\n', '\r']), out)?;
        }
        Ok(())
    }

    /// Decode a final unterminated line, if any.
    pub fn finish(&mut self) -> Result<String, FragmentError> {
        let mut text = String::new();
        self.finish_into(&mut text)?;
        Ok(text)
    }

    pub fn finish_into(&mut self, out: &mut String) -> Result<(), FragmentError> {
        self.drain_into(out)?;
        let rest = std::mem::take(&mut self.pending);
        decode_line(rest.trim_end_matches('\r'), out)
    }
}

fn decode_line(line: &str, out: &mut String) -> Result<(), FragmentError> {
    if line.is_empty() {
        return Ok(());
    }
    let Some(literal) = line.strip_prefix(TEXT_TAG) else {
        tracing::warn!(%line, "skipping fragment with unknown tag");
        return Ok(());
    };
    let fragment: String = serde_json::from_str(literal).map_err(|source| FragmentError {
        line: line.to_string(),
        source,
    })?;
    out.push_str(&fragment);
    Ok(())
}
