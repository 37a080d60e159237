//! Shared error type

use thiserror::Error;

/// Top-level error for the café agent
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State error: {0}")]
    State(String),
}

/// Result alias using the shared error
pub type Result<T> = std::result::Result<T, Error>;
