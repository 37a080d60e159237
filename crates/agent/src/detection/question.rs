//! Question-vs-answer intent detection
//!
//! Rule-based fast path first; the LLM is only consulted for inputs whose
//! length makes the heuristic unreliable.

use std::sync::Arc;

use serde::Deserialize;

use cafe_agent_config::constants::llm;
use cafe_agent_core::ToolDefinition;
use cafe_agent_llm::{GenerateRequest, LlmBackend};

use crate::extraction::schema::question_intent_tool;
use crate::state::FieldId;

use super::Confidence;

/// Question words at start of sentence
const QUESTION_STARTERS: &[&str] = &[
    "what", "how", "why", "when", "where", "which", "who", "do you", "can you", "could you",
    "would you", "will you", "are you", "is there", "does", "did you", "have you",
];

/// Question phrases anywhere in the message
const QUESTION_PHRASES: &[&str] = &[
    "tell me about",
    "tell me more",
    "i want to know",
    "i need to know",
    "wondering about",
    "curious about",
    "explain",
    "describe",
    "what about",
    "how about",
    "can i get",
    "could i get",
    "may i know",
    "id like to know",
    "i'd like to know",
    "i wanna know",
    "want to know more",
    "would like to know",
    "more details",
    "know more details",
    "details first",
    "information first",
    "before providing",
    "before giving",
    "first i would like",
];

/// Informational request patterns
const INFO_REQUESTS: &[&str] = &[
    "info on",
    "information on",
    "information about",
    "details on",
    "details about",
    "more about",
];

/// Rule-based question detection
pub struct QuestionRules;

impl QuestionRules {
    /// Whether the message looks like a question
    pub fn is_question(message: &str) -> bool {
        let lower = message.trim().to_lowercase();

        message.contains('?')
            || QUESTION_STARTERS.iter().any(|w| lower.starts_with(w))
            || QUESTION_PHRASES.iter().any(|p| lower.contains(p))
            || INFO_REQUESTS.iter().any(|p| lower.contains(p))
    }

    /// Whether the user appears to be answering the field just asked about
    pub fn is_answering_field(
        user_message: &str,
        last_bot_message: &str,
        current_field: Option<FieldId>,
    ) -> bool {
        let field = match current_field {
            Some(field) => field,
            None => return false,
        };
        if last_bot_message.is_empty() {
            return false;
        }

        let bot_lower = last_bot_message.to_lowercase();
        let keywords = crate::extraction::fallback_keywords(field);
        let bot_asked_field = keywords.iter().any(|kw| bot_lower.contains(kw));

        if bot_asked_field {
            let is_short = user_message.split_whitespace().count() <= 10;
            is_short && !Self::is_question(user_message)
        } else {
            false
        }
    }
}

/// LLM-detected question intent
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionIntent {
    pub is_question: bool,
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
}

/// LLM escalation for ambiguous-length inputs
pub struct LlmQuestionIntent {
    backend: Arc<dyn LlmBackend>,
    tool: ToolDefinition,
}

impl LlmQuestionIntent {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            tool: question_intent_tool(),
        }
    }

    /// Classify whether the message asks or answers; `None` when the call fails
    pub async fn detect(&self, user_message: &str, last_bot_message: &str) -> Option<QuestionIntent> {
        let context = if last_bot_message.is_empty() {
            String::new()
        } else {
            format!("Bot just asked: {}\n\n", last_bot_message)
        };

        let prompt = format!(
            "{context}User's message: \"{user_message}\"\n\n\
             Is the user ASKING A QUESTION (seeking information) or PROVIDING AN \
             ANSWER/STATEMENT?\n\n\
             Examples of QUESTIONS: \"What coffee do you offer?\", \"How much does it cost?\", \
             \"Tell me about your training\"\n\
             Examples of ANSWERS: \"In 6 months\" (answering timeline), \"Bold coffee\", \
             \"Yes\"/\"No\", \"John Smith\"\n\n\
             Context matters! If the bot asked \"What's your timeline?\", then \
             \"In 6 months\" is an ANSWER, not a question.",
        );

        let request = GenerateRequest::from_prompt(prompt)
            .with_forced_tool(self.tool.clone())
            .with_temperature(0.0)
            .with_max_tokens(llm::DETECTION_MAX_TOKENS);

        let outcome = match self.backend.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Question intent detection failed");
                return None;
            },
        };

        let call = outcome.tool_call("detect_question_intent")?;
        match call.parse_arguments::<QuestionIntent>() {
            Ok(intent) => {
                tracing::info!(
                    is_question = intent.is_question,
                    reasoning = %intent.reasoning,
                    "Question intent (LLM)"
                );
                Some(intent)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Malformed question intent arguments");
                None
            },
        }
    }
}

/// Whether the rule verdict is shaky enough to warrant the LLM
///
/// Escalate only when a question-shaped message is long (could be an answer
/// with an embedded question) or a non-question, non-answer message is long
/// enough to be ambiguous. Cheap heuristic first, expensive classifier second.
pub fn is_ambiguous_for_rules(
    user_message: &str,
    last_bot_message: &str,
    is_question_by_rules: bool,
    is_answering: bool,
) -> bool {
    if last_bot_message.is_empty() {
        return false;
    }
    let word_count = user_message.split_whitespace().count();
    (is_question_by_rules && word_count > 10)
        || (!is_question_by_rules && !is_answering && word_count > 5)
}
