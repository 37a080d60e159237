//! Customer-type detection via LLM function calling

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use cafe_agent_config::constants::llm;
use cafe_agent_core::{CustomerType, ToolDefinition, Turn, TurnRole};
use cafe_agent_llm::{GenerateRequest, LlmBackend};

use crate::extraction::schema::type_detection_tool;

use super::{Confidence, ContactInfo, TypeClassifier, TypeDetection};

const DETECTION_RULES: &str = "\
STRICT DETECTION RULES:

NEW CAFÉ (new_cafe) - ONLY if they explicitly state plans to OPEN/START:
- HIGH confidence: explicit action intent (\"I want to open a café\", \"I'm opening\", \
\"opening in 3 months\", \"starting a café\")
- MEDIUM confidence: implied but not committed (\"thinking of opening\", \
\"considering opening\", \"looking to open\")
- LOW confidence: vague or exploratory (\"interested in cafés\", \"tell me about opening\")

EXISTING CAFÉ (existing_cafe) - ONLY if they clearly OWN/OPERATE:
- HIGH confidence: clear ownership (\"I own a café\", \"I run a café\", \"my café\", \
\"we operate three cafés\", \"current supplier\")
- MEDIUM confidence: implied ownership (\"been in the café business\", \
\"looking for a new supplier\")
- LOW confidence: vague (\"interested in café supplies\")

UNCLEAR - general questions (\"tell me about coffee\", \"what do you offer\"), pure \
information seeking, or vague interest without explicit opening/owning.

BE CONSERVATIVE. Only use HIGH when the user has EXPLICITLY stated intent to open \
or clearly owns a café. Prefer UNCLEAR over forcing a classification.";

/// Shape of the detection tool's arguments
#[derive(Debug, Deserialize)]
struct TypeDetectionArgs {
    customer_type: String,
    confidence: Confidence,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    wants_to_place_order: bool,
    #[serde(default)]
    wants_to_talk_to_person: bool,
    #[serde(default)]
    contact_info: Option<ContactInfo>,
}

/// LLM-backed customer-type detector
pub struct LlmTypeDetector {
    backend: Arc<dyn LlmBackend>,
    tool: ToolDefinition,
}

impl LlmTypeDetector {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            tool: type_detection_tool(),
        }
    }

    fn build_prompt(&self, message: &str, history: &[Turn]) -> String {
        let mut context = String::new();
        for turn in history.iter().rev().take(3).rev() {
            let speaker = match turn.role {
                TurnRole::User => "User",
                TurnRole::Bot => "Bot",
            };
            context.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
        context.push_str(&format!("User: {}", message));

        format!(
            "Analyze this conversation to determine if the user is:\n\
             1. Planning to OPEN A NEW CAFÉ (new_cafe)\n\
             2. Already OWNS/OPERATES an existing café (existing_cafe)\n\
             3. Unclear - not enough information\n\n\
             Conversation:\n{context}\n\n{DETECTION_RULES}\n\n\
             Detect the customer type with confidence level.",
        )
    }
}

#[async_trait]
impl TypeClassifier for LlmTypeDetector {
    async fn classify(&self, message: &str, history: &[Turn]) -> Option<TypeDetection> {
        let request = GenerateRequest::from_prompt(self.build_prompt(message, history))
            .with_forced_tool(self.tool.clone())
            .with_temperature(0.0)
            .with_max_tokens(llm::DETECTION_MAX_TOKENS);

        let outcome = match self.backend.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Customer type detection failed");
                return None;
            },
        };

        let call = match outcome.tool_call("detect_customer_intent") {
            Some(call) => call,
            None => {
                tracing::warn!("LLM did not call the intent detection function");
                return None;
            },
        };

        let args: TypeDetectionArgs = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed type detection arguments");
                return None;
            },
        };

        let detection = TypeDetection {
            customer_type: CustomerType::from_str(&args.customer_type),
            confidence: args.confidence,
            reasoning: args.reasoning,
            wants_to_place_order: args.wants_to_place_order,
            wants_to_talk_to_person: args.wants_to_talk_to_person,
            contact_info: args.contact_info.unwrap_or_default(),
        };

        tracing::info!(
            customer_type = ?detection.customer_type,
            confidence = ?detection.confidence,
            reasoning = %detection.reasoning,
            "Customer type detected"
        );
        Some(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_agent_llm::{LlmError, LlmOutcome};

    struct ScriptedBackend {
        arguments: serde_json::Value,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
            assert_eq!(request.forced_tool.as_deref(), Some("detect_customer_intent"));
            Ok(LlmOutcome {
                text: String::new(),
                tool_calls: vec![cafe_agent_core::ToolCall {
                    id: "call_1".to_string(),
                    name: "detect_customer_intent".to_string(),
                    arguments: self.arguments.clone(),
                }],
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_parses_high_confidence_new_cafe() {
        let detector = LlmTypeDetector::new(Arc::new(ScriptedBackend {
            arguments: serde_json::json!({
                "customer_type": "new_cafe",
                "confidence": "high",
                "reasoning": "explicit opening intent",
                "wants_to_place_order": false,
                "wants_to_talk_to_person": false
            }),
        }));

        let detection = detector
            .classify("I want to open a café in 3 months", &[])
            .await
            .unwrap();
        assert_eq!(detection.customer_type, Some(CustomerType::NewCafe));
        assert_eq!(detection.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_unclear_maps_to_none_type() {
        let detector = LlmTypeDetector::new(Arc::new(ScriptedBackend {
            arguments: serde_json::json!({
                "customer_type": "unclear",
                "confidence": "low",
                "reasoning": "general question",
                "wants_to_place_order": false,
                "wants_to_talk_to_person": false,
                "contact_info": {"name": "Sam"}
            }),
        }));

        let detection = detector.classify("tell me about coffee", &[]).await.unwrap();
        assert_eq!(detection.customer_type, None);
        assert_eq!(detection.contact_info.name.as_deref(), Some("Sam"));
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn generate(&self, _request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
            Err(LlmError::Network("down".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failure_returns_none() {
        let detector = LlmTypeDetector::new(Arc::new(FailingBackend));
        assert!(detector.classify("hello", &[]).await.is_none());
    }
}
