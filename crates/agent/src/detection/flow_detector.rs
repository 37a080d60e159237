//! Flow-state detection during qualification

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use cafe_agent_config::constants::llm;
use cafe_agent_core::{last_bot_message, Turn, TurnRole};
use cafe_agent_llm::{GenerateRequest, LlmBackend};

use crate::state::FieldId;

use super::{FlowClassifier, FlowDetection, FlowState};

#[derive(Debug, Deserialize)]
struct FlowStateArgs {
    flow_state: FlowState,
    #[serde(default)]
    reasoning: String,
}

/// LLM-backed flow-state detector
pub struct LlmFlowDetector {
    backend: Arc<dyn LlmBackend>,
}

impl LlmFlowDetector {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    fn build_prompt(
        &self,
        message: &str,
        history: &[Turn],
        current_field: Option<FieldId>,
    ) -> String {
        let last_bot = last_bot_message(history).unwrap_or("");

        let mut context = String::new();
        for turn in history.iter().rev().take(3).rev() {
            let speaker = match turn.role {
                TurnRole::User => "User",
                TurnRole::Bot => "Bot",
            };
            context.push_str(&format!("{}: {}\n", speaker, turn.content));
        }

        let field_context = current_field
            .map(|f| format!("\nCurrent field being asked: {}", f))
            .unwrap_or_default();

        format!(
            "Analyze the user's response to determine their state/intent during the \
             qualification flow.\n\n\
             CONVERSATION CONTEXT:\n{context}\n\
             LAST BOT MESSAGE:\n{last_bot}{field_context}\n\n\
             CURRENT USER MESSAGE:\n{message}\n\n\
             FLOW STATES:\n\
             1. continuing - cooperating, providing information normally \
             (\"In 6 months\", \"Bold coffee\", \"Yes\", \"No\" as valid answers)\n\
             2. wants_to_exit - wants to stop the qualification entirely \
             (\"Stop\", \"Not interested\", \"Forget it\")\n\
             3. refuses_contact_info - doesn't want to provide phone/email, ONLY when \
             asked for contact info (\"I don't want to give my number\")\n\
             4. asking_question - asking a question instead of answering \
             (\"What is this for?\", \"What coffee do you offer?\")\n\n\
             IMPORTANT CONTEXT AWARENESS:\n\
             - \"No\" to \"What's your phone?\" = refuses_contact_info\n\
             - \"No\" to \"Do you need training?\" = continuing (valid answer)\n\
             - Consider what was asked in the last bot message!\n\n\
             RESPOND WITH JSON:\n\
             {{\"flow_state\": \"continuing\" | \"wants_to_exit\" | \
             \"refuses_contact_info\" | \"asking_question\", \"reasoning\": \"...\"}}",
        )
    }
}

#[async_trait]
impl FlowClassifier for LlmFlowDetector {
    async fn classify(
        &self,
        message: &str,
        history: &[Turn],
        current_field: Option<FieldId>,
    ) -> FlowDetection {
        let request = GenerateRequest::from_prompt(self.build_prompt(message, history, current_field))
            .with_system(
                "You are a helpful assistant that detects user flow states. \
                 Always respond with valid JSON.",
            )
            .with_temperature(0.0)
            .with_max_tokens(llm::DETECTION_MAX_TOKENS);

        let outcome = match self.backend.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Flow state detection failed");
                return FlowDetection::continuing("Detection failed, assuming continuing");
            },
        };

        // The model answers with a bare JSON object; strip code fences if any
        let raw = outcome.text.trim().trim_start_matches("```json").trim_matches('`').trim();
        match serde_json::from_str::<FlowStateArgs>(raw) {
            Ok(args) => {
                tracing::info!(state = ?args.flow_state, reasoning = %args.reasoning, "Flow state detected");
                FlowDetection {
                    state: args.flow_state,
                    reasoning: args.reasoning,
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, raw, "Unparseable flow state response");
                FlowDetection::continuing("Detection unparseable, assuming continuing")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_agent_llm::{LlmError, LlmOutcome};

    struct TextBackend {
        text: String,
    }

    #[async_trait]
    impl LlmBackend for TextBackend {
        async fn generate(&self, _request: GenerateRequest) -> Result<LlmOutcome, LlmError> {
            Ok(LlmOutcome {
                text: self.text.clone(),
                tool_calls: vec![],
            })
        }

        fn model_name(&self) -> &str {
            "text"
        }
    }

    #[tokio::test]
    async fn test_parses_refusal_state() {
        let detector = LlmFlowDetector::new(Arc::new(TextBackend {
            text: r#"{"flow_state": "refuses_contact_info", "reasoning": "declined phone"}"#
                .to_string(),
        }));

        let history = vec![Turn::bot("What's the best number to reach you?")];
        let detection = detector
            .classify("I don't want to give my number", &history, Some(FieldId::Phone))
            .await;
        assert_eq!(detection.state, FlowState::RefusesContactInfo);
    }

    #[tokio::test]
    async fn test_garbage_defaults_to_continuing() {
        let detector = LlmFlowDetector::new(Arc::new(TextBackend {
            text: "I think the user is fine".to_string(),
        }));
        let detection = detector.classify("ok", &[], None).await;
        assert_eq!(detection.state, FlowState::Continuing);
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
    async fn test_failure_defaults_to_continuing() {
        let detector = LlmFlowDetector::new(Arc::new(FailingBackend));
        let detection = detector.classify("hello", &[], None).await;
        assert_eq!(detection.state, FlowState::Continuing);
    }
}
