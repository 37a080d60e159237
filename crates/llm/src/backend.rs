//! LLM backend trait and the OpenAI-compatible implementation
//!
//! The backend speaks the Chat Completions wire format with native tool
//! calling. Classification and extraction calls force a specific tool via
//! `tool_choice`; response generation runs without tools.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cafe_agent_core::llm_types::{Message, Role, ToolCall, ToolDefinition};

use crate::LlmError;

/// One completion request
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Conversation messages (system message optional, first)
    pub messages: Vec<Message>,
    /// System instruction, prepended as a system message
    pub system: Option<String>,
    /// Tools available to the model
    pub tools: Vec<ToolDefinition>,
    /// Force this tool to be called (by name)
    pub forced_tool: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Max tokens to generate
    pub max_tokens: usize,
}

impl GenerateRequest {
    /// Plain completion request
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: 256,
            ..Default::default()
        }
    }

    /// Single-prompt request
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Force a structured call against the given tool
    pub fn with_forced_tool(mut self, tool: ToolDefinition) -> Self {
        self.forced_tool = Some(tool.name.clone());
        self.tools = vec![tool];
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Parsed completion outcome
#[derive(Debug, Clone, Default)]
pub struct LlmOutcome {
    /// Free-text content (may be empty when the model called a tool)
    pub text: String,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
}

impl LlmOutcome {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// First call to the named tool, if any
    pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|c| c.name == name)
    }
}

/// LLM backend trait
///
/// Detectors, extractors, and the response builder all go through this port,
/// so tests can substitute a deterministic stub for the live API.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run one completion
    async fn generate(&self, request: GenerateRequest) -> Result<LlmOutcome, LlmError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: String,
    /// Model id
    pub model: String,
    /// API endpoint (for proxies or self-hosted gateways)
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// OpenAI-compatible chat backend with native tool calling
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "API key not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn convert_messages(&self, request: &GenerateRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref system) = request.system {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        for msg in &request.messages {
            messages.push(WireMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            });
        }
        messages
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|t| WireTool {
                kind: "function".to_string(),
                function: WireFunctionDef {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn parse_response(&self, response: ChatResponse) -> Result<LlmOutcome, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let mut tool_calls = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            // Arguments arrive as a JSON-encoded string on this wire format
            let arguments: serde_json::Value = serde_json::from_str(&call.function.arguments)
                .map_err(|e| {
                    LlmError::InvalidResponse(format!("Malformed tool arguments: {}", e))
                })?;
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }

        Ok(LlmOutcome {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
        let tools = self.convert_tools(&request.tools);

        let wire_request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(&request),
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice: request.forced_tool.as_ref().map(|name| {
                serde_json::json!({"type": "function", "function": {"name": name}})
            }),
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&wire_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "LLM API request failed");
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.parse_response(response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAiConfig::new("test-key")
            .with_model("gpt-4o")
            .with_endpoint("http://localhost:8080");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_backend_requires_api_key() {
        let config = OpenAiConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(OpenAiBackend::new(config).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            tools: None,
            tool_choice: Some(
                serde_json::json!({"type": "function", "function": {"name": "extract_customer_data"}}),
            ),
            temperature: Some(0.0),
            max_tokens: Some(300),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("extract_customer_data"));
        assert!(!json.contains("\"tools\""));
    }

    #[test]
    fn test_response_parsing_text() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("k")).unwrap();
        let json = r#"{
            "choices": [
                {"message": {"content": "Hello there!", "tool_calls": null}}
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let outcome = backend.parse_response(response).unwrap();
        assert_eq!(outcome.text, "Hello there!");
        assert!(!outcome.has_tool_calls());
    }

    #[test]
    fn test_response_parsing_tool_call() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("k")).unwrap();
        let json = r#"{
            "choices": [
                {"message": {"content": null, "tool_calls": [
                    {"id": "call_1", "function": {
                        "name": "detect_customer_intent",
                        "arguments": "{\"customer_type\": \"new_cafe\", \"confidence\": \"high\"}"
                    }}
                ]}}
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let outcome = backend.parse_response(response).unwrap();
        assert!(outcome.has_tool_calls());
        let call = outcome.tool_call("detect_customer_intent").unwrap();
        assert_eq!(call.arguments["customer_type"], "new_cafe");
    }

    #[test]
    fn test_malformed_tool_arguments_rejected() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("k")).unwrap();
        let json = r#"{
            "choices": [
                {"message": {"content": null, "tool_calls": [
                    {"id": "call_1", "function": {"name": "x", "arguments": "not json"}}
                ]}}
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(backend.parse_response(response).is_err());
    }
}
