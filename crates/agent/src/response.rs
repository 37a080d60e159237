//! Final response generation
//!
//! One completion call with the persona instruction and the composed context.
//! There is no fallback text source here, so a failure propagates to the
//! caller - the only place in the turn allowed to do so.

use std::sync::Arc;

use cafe_agent_config::constants::llm;
use cafe_agent_core::Turn;
use cafe_agent_llm::{GenerateRequest, LlmBackend};

use crate::composer::PromptComposer;
use crate::detection::QuestionRules;
use crate::state::ConversationState;
use crate::AgentError;

/// Builds context and generates the outward-facing reply
pub struct ResponseBuilder {
    backend: Arc<dyn LlmBackend>,
    composer: PromptComposer,
}

impl ResponseBuilder {
    pub fn new(backend: Arc<dyn LlmBackend>, composer: PromptComposer) -> Self {
        Self { backend, composer }
    }

    /// Generate the reply for a turn no earlier step handled
    pub async fn generate(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        use_rag_instruction: bool,
        just_provided_contact: &[String],
    ) -> Result<String, AgentError> {
        let is_question = QuestionRules::is_question(user_message);

        let mut context_parts = self.composer.build_context(user_message, state, is_question);

        if !just_provided_contact.is_empty() {
            context_parts.push(format!(
                "USER JUST PROVIDED: {} - acknowledge this warmly in your response!",
                just_provided_contact.join(", ")
            ));
        }

        let formatted_message = if context_parts.is_empty() {
            user_message.to_string()
        } else {
            format!("{}\n\nUser: {}", context_parts.join("\n\n"), user_message)
        };

        let messages = self.composer.build_message_history(history, &formatted_message);
        let system = self.composer.select_system_instruction(use_rag_instruction);

        let request = GenerateRequest::new(messages)
            .with_system(system)
            .with_max_tokens(llm::RESPONSE_MAX_TOKENS);

        let outcome = self
            .backend
            .generate(request)
            .await
            .map_err(|e| AgentError::ResponseGeneration(e.to_string()))?;

        Ok(outcome.text)
    }
}
