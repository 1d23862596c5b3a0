//! OpenAI-compatible streaming provider
//!
//! Works with any API that implements the OpenAI chat completions format
//! with `stream: true` (OpenAI, Groq, vLLM, LM Studio, ...). The response is
//! handed back as a raw byte stream; framing is the relay's job.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::conversation::{Role, Turn};

use super::ProviderError;

/// Upstream response body, chunked as it arrives on the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
            name: turn.name.clone(),
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// One `data:` payload of a streamed completion. Only the consumed fields
/// are modelled; anything else the provider sends is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Text delta of the first choice, if it carries any.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Base URL for the API (e.g., https://api.openai.com/v1)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    pub model: String,
    /// Optional organization ID (OpenAI)
    pub organization: Option<String>,
    /// Optional project ID (OpenAI)
    pub project: Option<String>,
    pub temperature: Option<f32>,
    /// Connect timeout in seconds. Streams themselves are not time-limited.
    pub connect_timeout_secs: u64,
}

impl Default for OpenAICompatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            organization: None,
            project: None,
            temperature: None,
            connect_timeout_secs: 10,
        }
    }
}

impl From<&Config> for OpenAICompatConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: Some(config.openai_api_key.clone()),
            model: config.model.clone(),
            organization: config.openai_organization.clone(),
            project: config.openai_project.clone(),
            temperature: config.temperature,
            ..Self::default()
        }
    }
}

/// OpenAI-compatible API provider
#[derive(Debug)]
pub struct OpenAICompatProvider {
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    pub fn new(config: OpenAICompatConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Open a streaming chat completion. Fails before any byte is returned
    /// when the provider can't be reached or answers with an error status.
    pub async fn stream_chat(&self, turns: &[Turn]) -> Result<ByteStream, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: turns.iter().map(ChatMessage::from).collect(),
            stream: true,
            temperature: self.config.temperature,
        };

        let mut req_builder = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header(AUTHORIZATION, format!("Bearer {}", api_key));
        }

        if let Some(ref org) = self.config.organization {
            req_builder = req_builder.header("OpenAI-Organization", org);
        }

        if let Some(ref project) = self.config.project {
            req_builder = req_builder.header("OpenAI-Project", project);
        }

        tracing::debug!(%url, model = %request.model, turns = request.messages.len(), "opening upstream stream");

        let response = req_builder
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error_resp) => error_resp.error.message,
                Err(_) => body,
            };
            return Err(ProviderError::Status { status, message });
        }

        if response.content_length() == Some(0) {
            return Err(ProviderError::MissingBody);
        }

        Ok(response.bytes_stream().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_conversion() {
        let turn = Turn::instruction("Sonic", "Be fast");
        let json = serde_json::to_value(ChatMessage::from(&turn)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "developer", "content": "Be fast", "name": "Sonic"})
        );

        let mut turn = Turn::user(7, "Hi");
        turn.is_typing = true;
        let json = serde_json::to_value(ChatMessage::from(&turn)).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "Hi"}));
    }

    #[test]
    fn test_request_body() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::from(&Turn::user(1, "Hi"))],
            stream: true,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_chunk_tolerates_extra_fields() {
        let payload = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,
            "model":"gpt-4o-mini","system_fingerprint":"fp","choices":[{"index":0,
            "delta":{"role":"assistant","content":"Hel"},"logprobs":null,"finish_reason":null}]}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(payload).unwrap();
        assert_eq!(chunk.delta_text(), Some("Hel"));
        assert!(chunk.finish_reason().is_none());
    }

    #[test]
    fn test_chunk_without_text() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.delta_text(), None);
        assert_eq!(chunk.finish_reason(), Some("stop"));

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(chunk.delta_text(), None);

        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.delta_text(), None);
    }

    #[test]
    fn test_error_frame() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"error":{"message":"overloaded","type":"server_error"}}"#,
        )
        .unwrap();
        let error = chunk.error.unwrap();
        assert_eq!(error.message, "overloaded");
        assert_eq!(error.error_type.as_deref(), Some("server_error"));
    }

    #[test]
    fn test_config_from_app_config() {
        let config = Config::from_lookup(|key: &str| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "OPENAI_PROJECT" => Some("proj".into()),
            _ => None,
        })
        .unwrap();
        let provider = OpenAICompatConfig::from(&config);
        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(provider.project.as_deref(), Some("proj"));
        assert_eq!(provider.connect_timeout_secs, 10);
    }
}
