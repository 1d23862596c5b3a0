//! AI provider integrations

pub mod openai_compat;

use reqwest::StatusCode;
use thiserror::Error;

pub use openai_compat::{ByteStream, OpenAICompatConfig, OpenAICompatProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Upstream response has no body")]
    MissingBody,
}
