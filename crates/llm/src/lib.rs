//! LLM integration
//!
//! Features:
//! - `LlmBackend` trait with chat completion and native tool calling
//! - OpenAI-compatible HTTP backend
//! - `ToolBuilder` for JSON-Schema tool definitions

pub mod backend;
pub mod prompt;

pub use backend::{GenerateRequest, LlmBackend, LlmOutcome, OpenAiBackend, OpenAiConfig};
pub use prompt::ToolBuilder;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for cafe_agent_core::Error {
    fn from(err: LlmError) -> Self {
        cafe_agent_core::Error::Llm(err.to_string())
    }
}
