//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{flow, llm, rag};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// LLM backend configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Retrieval configuration
    #[serde(default)]
    pub rag: RagSettings,

    /// Conversation flow configuration
    #[serde(default)]
    pub agent: AgentSettings,
}

/// LLM backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// API endpoint (OpenAI-compatible)
    pub endpoint: String,
    /// Model id
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default temperature for response generation
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: llm::DEFAULT_ENDPOINT.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
        }
    }
}

/// Retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Path to the offline-built knowledge snapshot (JSON)
    pub snapshot_path: String,
    /// Default number of chunks to retrieve
    pub top_k: usize,
    /// Minimum similarity score for a chunk to be used
    pub min_score: f32,
    /// Embedding dimension of the snapshot
    pub embedding_dim: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            snapshot_path: "data/knowledge_snapshot.json".to_string(),
            top_k: rag::DEFAULT_TOP_K,
            min_score: rag::MIN_SCORE,
            embedding_dim: rag::EMBEDDING_DIM,
        }
    }
}

/// Conversation flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Default country for bare phone numbers
    pub default_country: String,
    /// Asks of a skippable field before it is auto-skipped
    pub max_field_asks: u32,
    /// Preferred-field skips before the rest are bulk-skipped
    pub max_preferred_skips: u32,
    /// Stagger between parallel detection dispatches, in milliseconds
    pub detection_stagger_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            default_country: "US".to_string(),
            max_field_asks: flow::MAX_FIELD_ASKS,
            max_preferred_skips: flow::MAX_PREFERRED_SKIPS,
            detection_stagger_ms: flow::DETECTION_STAGGER_MS,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file (if present) plus environment overrides
    ///
    /// Environment variables use the `CAFE_AGENT_` prefix with `__` as the
    /// section separator, e.g. `CAFE_AGENT_LLM__MODEL=gpt-4o`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("CAFE_AGENT").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(
            endpoint = %settings.llm.endpoint,
            model = %settings.llm.model,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.endpoint.is_empty() {
            return Err(ConfigError::Validation("llm.endpoint must not be empty".into()));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Validation("rag.top_k must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature out of range: {}",
                self.llm.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::new();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.agent.default_country, "US");
        assert_eq!(settings.agent.max_preferred_skips, 2);
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let mut settings = Settings::new();
        settings.llm.temperature = 5.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::load("does/not/exist.toml").unwrap();
        assert_eq!(settings.rag.top_k, 3);
    }
}
