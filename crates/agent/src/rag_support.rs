//! Knowledge-base answering with the redirect strategy
//!
//! During qualification the first questions get a gentle redirect back to the
//! pending field; repeated questions get progressively firmer until the agent
//! defers answers until qualification is done. Qualified and exploring users
//! get full answers with no redirect.

use std::sync::Arc;

use cafe_agent_config::constants::{llm, rag};
use cafe_agent_core::TurnOutcome;
use cafe_agent_llm::{GenerateRequest, LlmBackend};
use cafe_agent_rag::Retriever;

use crate::prompts;
use crate::state::ConversationState;

/// Build the "user's own information" context block
pub fn build_collected_data_context(state: Option<&ConversationState>) -> String {
    let state = match state {
        Some(state) => state,
        None => return String::new(),
    };

    let mut collected: Vec<(&str, String)> = Vec::new();
    let fields: Vec<crate::state::FieldId> = match state.customer_type {
        Some(ct) => {
            let mut fields = state.required_fields(ct).to_vec();
            fields.extend_from_slice(state.preferred_fields(ct));
            fields.push(crate::state::FieldId::Phone);
            fields.push(crate::state::FieldId::Email);
            fields
        },
        None => vec![
            crate::state::FieldId::Name,
            crate::state::FieldId::Phone,
            crate::state::FieldId::Email,
        ],
    };
    for field in fields {
        if let Some(value) = state.given_value(field) {
            collected.push((field.as_str(), value.to_string()));
        }
    }

    if collected.is_empty() {
        return String::new();
    }

    let mut context = String::from("\n\nUSER'S INFORMATION (use this when relevant):\n");
    for (field, value) in collected {
        context.push_str(&format!("   - {}: {}\n", field, value));
    }
    context.push_str(
        "\nIf the user asks about THEIR OWN information (their name, email, phone, \
         timeline, etc.), use the USER'S INFORMATION above. Do not say you can't share it.",
    );
    context
}

/// Redirect wording escalates with the number of questions asked
fn redirect_instruction(rag_count: u32, next_field_question: &str) -> String {
    match rag_count {
        1 => format!(
            "Answer their question using the knowledge base, then add a gentle redirect.\n\
             Example format: \"Great question! [answer]. By the way, {}\"\n\
             Keep it natural and conversational (1-2 sentences max).",
            next_field_question
        ),
        2 => format!(
            "Answer their question, then add a stronger redirect showing enthusiasm.\n\
             Example format: \"[answer]. I'd love to help you more! {}\"\n\
             Keep it natural and conversational (1-2 sentences max).",
            next_field_question
        ),
        3 => format!(
            "Answer their question, acknowledge their diligence, then redirect with value.\n\
             Example format: \"[answer]. I can tell you're really thinking this through! {}\"\n\
             Keep it natural and conversational (1-2 sentences max).",
            next_field_question
        ),
        _ => format!(
            "Politely defer and create urgency to qualify first.\n\
             Example format: \"I can definitely help with that! Let me get a few quick \
             details first, then I'll give you comprehensive answers. {}\"\n\
             Keep it friendly but firm (1-2 sentences max).",
            next_field_question
        ),
    }
}

/// Answers knowledge-base questions
pub struct AnswerHandler {
    retriever: Arc<Retriever>,
    backend: Arc<dyn LlmBackend>,
}

impl AnswerHandler {
    pub fn new(retriever: Arc<Retriever>, backend: Arc<dyn LlmBackend>) -> Self {
        Self { retriever, backend }
    }

    fn knowledge_context(&self, query: &str, k: usize) -> String {
        match self.retriever.retrieve(query, k) {
            Ok(hits) if !hits.is_empty() => self.retriever.format_context(&hits),
            Ok(_) => "No specific information found in the knowledge base.".to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Knowledge retrieval failed");
                "No specific information found in the knowledge base.".to_string()
            },
        }
    }

    /// Answer a question during qualification, counting it and redirecting
    pub async fn handle_rag_question(
        &self,
        user_message: &str,
        state: &mut ConversationState,
        next_field_question: &str,
    ) -> TurnOutcome {
        let rag_count = state.increment_rag_count();
        state.add_rag_topic(user_message);
        tracing::info!(count = rag_count, question = user_message, "RAG question");

        let rag_context = self.knowledge_context(user_message, rag::QUALIFYING_TOP_K);
        let redirect = redirect_instruction(rag_count, next_field_question);
        let collected = build_collected_data_context(Some(state));

        let prompt = format!(
            "User asked: {user_message}\n{collected}\n\n\
             Knowledge base context:\n{rag_context}\n\n{redirect}\n\n\
             You're Logan - warm, helpful, and conversational.",
        );

        let request = GenerateRequest::from_prompt(prompt)
            .with_system(prompts::BASE_INSTRUCTION)
            .with_max_tokens(llm::RESPONSE_MAX_TOKENS);

        match self.backend.generate(request).await {
            Ok(outcome) => TurnOutcome::reply(outcome.text),
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate RAG response");
                TurnOutcome::reply(format!(
                    "That's a great question! Let me get a few details about your café \
                     first, then I can give you the best answer. {}",
                    next_field_question
                ))
            },
        }
    }

    /// Answer a question with no redirect (qualified or exploring users)
    pub async fn answer_unlimited(
        &self,
        user_message: &str,
        state: Option<&ConversationState>,
    ) -> TurnOutcome {
        let rag_context = self.knowledge_context(user_message, rag::DEFAULT_TOP_K);
        let collected = build_collected_data_context(state);

        let prompt = format!(
            "User asked: {user_message}\n{collected}\n\n\
             Knowledge base context:\n{rag_context}\n\n\
             Provide a helpful, comprehensive answer. You're Logan - warm and conversational.",
        );

        let request = GenerateRequest::from_prompt(prompt)
            .with_system(prompts::BASE_INSTRUCTION)
            .with_max_tokens(llm::RESPONSE_MAX_TOKENS);

        match self.backend.generate(request).await {
            Ok(outcome) => TurnOutcome::reply(outcome.text),
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate RAG response");
                TurnOutcome::reply(
                    "I'd be happy to help with that! Could you rephrase your question?",
                )
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FieldId, FieldValue};

    #[test]
    fn test_redirect_escalation() {
        let q = "When are you opening?";
        assert!(redirect_instruction(1, q).contains("gentle redirect"));
        assert!(redirect_instruction(2, q).contains("stronger redirect"));
        assert!(redirect_instruction(3, q).contains("diligence"));
        assert!(redirect_instruction(4, q).contains("defer"));
        assert!(redirect_instruction(9, q).contains("defer"));
    }

    #[test]
    fn test_collected_context_skips_sentinels() {
        let mut state = ConversationState::new();
        state.customer_type = Some(cafe_agent_core::CustomerType::NewCafe);
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        state.set_field(FieldId::Volume, FieldValue::ToBeDiscussed);
        state.set_field(FieldId::Phone, FieldValue::Declined);

        let context = build_collected_data_context(Some(&state));
        assert!(context.contains("name: Sam"));
        assert!(!context.contains("to_be_discussed_with_team"));
        assert!(!context.contains("user_declined"));
    }

    #[test]
    fn test_collected_context_empty_without_data() {
        let state = ConversationState::new();
        assert_eq!(build_collected_data_context(Some(&state)), "");
        assert_eq!(build_collected_data_context(None), "");
    }
}
