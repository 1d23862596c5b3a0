//! Fixed instruction loading
//!
//! Every upstream request is prefixed with one developer instruction. It
//! defaults to the built-in Sonic persona and can be replaced at startup with
//! a TOML file.
//!
//! # Example Prompt File
//!
//! ```toml
//! [persona]
//! name = "Sonic"
//! description = "Fast markdown assistant"
//!
//! [system_prompt]
//! content = """
//! Your name is Sonic...
//! """
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::conversation::Turn;

/// A persona/prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Persona metadata
    pub persona: PersonaInfo,

    /// The instruction text
    pub system_prompt: SystemPrompt,
}

/// Persona metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    /// Name sent alongside the instruction
    pub name: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub content: String,
}

impl PromptTemplate {
    /// Load a template from a file path
    pub async fn load_from_file(path: &Path) -> Result<Self, PromptError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, PromptError> {
        let template: Self =
            toml::from_str(content).map_err(|e| PromptError::ParseError(e.to_string()))?;

        if template.system_prompt.content.trim().is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(template)
    }

    pub fn into_turn(self) -> Turn {
        Turn::instruction(self.persona.name, self.system_prompt.content.trim())
    }
}

/// Resolve the instruction turn once, from `path` when given.
pub async fn fixed_instruction(path: Option<&Path>) -> Result<Turn, PromptError> {
    match path {
        Some(path) => {
            let template = PromptTemplate::load_from_file(path).await?;
            tracing::info!(persona = %template.persona.name, "loaded instruction from {}", path.display());
            Ok(template.into_turn())
        }
        None => Ok(Turn::instruction(builtin::SONIC_NAME, builtin::SONIC)),
    }
}

/// Errors from prompt loading
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Prompt content is empty")]
    Empty,
}

/// Built-in prompts that don't require files
pub mod builtin {
    pub const SONIC_NAME: &str = "Sonic";

    pub const SONIC: &str = "Your name is Sonic and you are the fastest AI on the planet, make sure to always response with proper markdown.";
}
