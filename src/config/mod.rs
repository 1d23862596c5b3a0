//! Application configuration

pub mod prompts;

use std::env;
use std::fmt;
use std::path::PathBuf;

pub use prompts::{fixed_instruction, PromptError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_organization: Option<String>,
    pub openai_project: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// Optional TOML persona replacing the built-in instruction.
    pub prompt_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => 3000,
        };

        let temperature = match get("SONIC_TEMPERATURE") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                key: "SONIC_TEMPERATURE",
                value: raw,
            })?),
            None => None,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port,
            openai_api_key,
            openai_organization: get("OPENAI_ORGANIZATION"),
            openai_project: get("OPENAI_PROJECT"),
            base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: get("SONIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            temperature,
            prompt_file: get("SONIC_PROMPT_FILE").map(PathBuf::from),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("openai_api_key", &"<redacted>")
            .field("openai_organization", &self.openai_organization)
            .field("openai_project", &self.openai_project)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("prompt_file", &self.prompt_file)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
