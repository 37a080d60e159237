//! Configuration for the café agent
//!
//! Settings are loaded from an optional TOML file plus `CAFE_AGENT_*`
//! environment overrides, following the same layering the server deployment
//! uses. Constants keep the tuning knobs that do not need to be configurable
//! in one place.

pub mod constants;
pub mod settings;
pub mod telemetry;

pub use settings::{AgentSettings, LlmSettings, RagSettings, Settings};
pub use telemetry::init_tracing;

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
