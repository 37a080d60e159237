//! Prompt composition for response generation
//!
//! Assembles the message history, the "already collected" block, and the
//! stage-specific instruction text that steers the model each turn.

use std::sync::Arc;

use cafe_agent_config::constants::{flow, rag};
use cafe_agent_core::{IntentStage, Message, Turn, TurnRole};
use cafe_agent_rag::Retriever;

use crate::prompts;
use crate::questions::QuestionGenerator;
use crate::state::{ConversationState, FieldId, FieldValue};

/// Builds message history and LLM context for outbound responses
pub struct PromptComposer {
    retriever: Arc<Retriever>,
    questions: QuestionGenerator,
}

impl PromptComposer {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            retriever,
            questions: QuestionGenerator::new(),
        }
    }

    /// Trimmed recent history plus the current (context-wrapped) message
    pub fn build_message_history(&self, history: &[Turn], current_message: &str) -> Vec<Message> {
        let start = history.len().saturating_sub(flow::HISTORY_TURNS);
        let mut messages: Vec<Message> = history[start..]
            .iter()
            .map(|turn| match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Bot => Message::assistant(turn.content.clone()),
            })
            .collect();
        messages.push(Message::user(current_message.to_string()));
        messages
    }

    /// System instruction for this turn
    pub fn select_system_instruction(&self, use_rag_instruction: bool) -> &'static str {
        if use_rag_instruction {
            prompts::RAG_ANSWER_INSTRUCTION
        } else {
            prompts::BASE_INSTRUCTION
        }
    }

    /// Dynamic context block: knowledge snippets, collected data, stage guidance
    ///
    /// Mutates ask tracking when the qualifying stage picks the next question.
    pub fn build_context(
        &self,
        user_message: &str,
        state: &mut ConversationState,
        is_question: bool,
    ) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();

        if is_question {
            if let Ok(hits) = self.retriever.retrieve(user_message, rag::QUALIFYING_TOP_K) {
                if !hits.is_empty() {
                    parts.push(format!(
                        "Knowledge base:\n{}",
                        self.retriever.format_context(&hits)
                    ));
                }
            }
        }

        let collected = self.collected_data(state);
        if !collected.is_empty() {
            parts.push("ALREADY COLLECTED DATA (NEVER ask for these again):".to_string());
            for (field, value) in &collected {
                parts.push(format!("   - {}: {}", field, value));
            }
            parts.push(
                "Reference this data naturally and NEVER ask for information you already have."
                    .to_string(),
            );

            if !state.human_connection_confirmed {
                if let Some((_, phone)) = collected.iter().find(|(f, _)| *f == "phone") {
                    parts.push(format!(
                        "IF USER ASKS TO TALK TO A PERSON: say our team will reach out at {} \
                         and confirm it's still the best number, then ask for an email backup.",
                        phone
                    ));
                } else {
                    parts.push(
                        "IF USER ASKS TO TALK TO A PERSON: offer to connect them and ask for \
                         the best number to reach them, then an email backup."
                            .to_string(),
                    );
                }
            }
        }

        self.stage_guidance(state, &collected, &mut parts);
        parts
    }

    fn collected_data(&self, state: &ConversationState) -> Vec<(&'static str, String)> {
        let mut collected = Vec::new();
        let fields: Vec<FieldId> = match state.customer_type {
            Some(ct) => {
                let mut fields = state.required_fields(ct).to_vec();
                fields.extend_from_slice(state.preferred_fields(ct));
                fields.push(FieldId::Phone);
                fields.push(FieldId::Email);
                fields
            },
            None => vec![FieldId::Name, FieldId::Phone, FieldId::Email],
        };
        for field in fields {
            if let Some(FieldValue::Given(value)) = state.get_field(field) {
                collected.push((field.as_str(), value.clone()));
            }
        }
        collected
    }

    fn stage_guidance(
        &self,
        state: &mut ConversationState,
        collected: &[(&'static str, String)],
        parts: &mut Vec<String>,
    ) {
        match state.intent_stage {
            IntentStage::Exploring => {
                parts.push(
                    "Stage: EXPLORING - user is asking questions. Answer naturally and help \
                     them explore. If they share contact info, acknowledge it warmly."
                        .to_string(),
                );
            },
            IntentStage::InterestDetected => {
                parts.push(
                    "Stage: INTEREST DETECTED - user showed interest but hasn't committed. \
                     Answer fully and naturally; occasionally (not every time) add a gentle \
                     nudge to gauge readiness, like 'Are you planning to open soon, or still \
                     exploring?'. Don't be pushy."
                        .to_string(),
                );
            },
            IntentStage::IntentConfirmed => {
                parts.push(
                    "Stage: INTENT CONFIRMED - first message after detecting their intent. \
                     Start with a warm transition: celebrate their plans and acknowledge the \
                     specifics they shared, ask permission to learn more, then ask the first \
                     qualification question naturally. Never jump straight into interrogation."
                        .to_string(),
                );
                for (field, value) in collected {
                    if *field == "cafe_count" || *field == "timeline" {
                        parts.push(format!(
                            "   They mentioned {}: {} - acknowledge this!",
                            field,
                            value.replace('_', " ")
                        ));
                    }
                }
            },
            IntentStage::Qualifying => {
                let ct = match state.customer_type {
                    Some(ct) => ct,
                    None => return,
                };
                // Once a hand-off is confirmed the team takes over; stop
                // asking qualification questions
                if state.human_connection_confirmed {
                    return;
                }
                let collected_fields = state.collected_fields(ct);
                let mut missing = state.missing_fields(ct);
                // Topics the conversation already covered are not re-asked
                missing.retain(|f| !state.was_topic_discussed(f.as_str()));
                let required = state.required_fields(ct);

                if state.skipped_preferred_count >= flow::MAX_PREFERRED_SKIPS {
                    parts.push(
                        "SMART SKIP: the user skipped several preferred fields - they're in \
                         an early planning phase. Use a friendly transition like 'No worries! \
                         Our team can help you figure out the details when they connect.'"
                            .to_string(),
                    );
                }
                if !collected_fields.is_empty() {
                    let names: Vec<&str> =
                        collected_fields.iter().map(|f| f.as_str()).collect();
                    parts.push(format!("Already collected: {}", names.join(", ")));
                }

                let mut next_field = match missing.first() {
                    Some(field) => *field,
                    None => return,
                };
                state.track_field_ask(next_field);
                if state.should_skip_field() {
                    state.set_field(next_field, FieldValue::ToBeDiscussed);
                    missing = state.missing_fields(ct);
                    next_field = match missing.first() {
                        Some(field) => *field,
                        None => return,
                    };
                    state.track_field_ask(next_field);
                }

                let missing_required: Vec<&str> = missing
                    .iter()
                    .filter(|f| required.contains(*f))
                    .map(|f| f.as_str())
                    .collect();
                let missing_preferred: Vec<&str> = missing
                    .iter()
                    .filter(|f| !required.contains(*f) && !f.is_contact())
                    .map(|f| f.as_str())
                    .collect();
                if !missing_required.is_empty() {
                    parts.push(format!("REQUIRED (must have): {}", missing_required.join(", ")));
                }
                if !missing_preferred.is_empty() {
                    parts.push(format!(
                        "PREFERRED (nice to have, can skip if unclear): {}",
                        missing_preferred.join(", ")
                    ));
                }

                let needs_contact =
                    !state.is_set(FieldId::Phone) && !state.is_set(FieldId::Email);
                if needs_contact {
                    parts.push("REQUIRED: phone OR email (at least one)".to_string());
                }

                let question = self.questions.field_question(next_field);
                let required_ask = required.contains(&next_field)
                    || (next_field.is_contact() && needs_contact);
                if required_ask {
                    parts.push(format!("Ask EXACTLY (REQUIRED): {}", question));
                } else {
                    parts.push(format!(
                        "Ask EXACTLY (optional, can skip if they don't know): {}",
                        question
                    ));
                }
            },
            IntentStage::Qualified => {
                parts.push(
                    "Customer is qualified! Be warm and supportive: answer questions \
                     enthusiastically, reference their plans naturally, and keep the door \
                     open ('Any other questions while we're chatting?')."
                        .to_string(),
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_agent_core::CustomerType;
    use cafe_agent_rag::{
        build_snapshot, Document, HashEmbedder, Retriever, RetrieverConfig,
    };

    fn composer() -> PromptComposer {
        let embedder = Arc::new(HashEmbedder::default());
        let docs = vec![Document::new("1", "We offer seven signature blends")];
        let index = build_snapshot(docs, embedder.as_ref())
            .unwrap()
            .into_index()
            .unwrap();
        PromptComposer::new(Arc::new(Retriever::new(
            index,
            embedder,
            RetrieverConfig::default(),
        )))
    }

    #[test]
    fn test_history_trimmed_to_recent_turns() {
        let composer = composer();
        let history: Vec<Turn> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("u{}", i))
                } else {
                    Turn::bot(format!("b{}", i))
                }
            })
            .collect();

        let messages = composer.build_message_history(&history, "current");
        assert_eq!(messages.len(), 7);
        assert_eq!(messages.last().unwrap().content, "current");
        assert_eq!(messages[0].content, "u4");
    }

    #[test]
    fn test_context_lists_collected_and_next_question() {
        let composer = composer();
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.set_intent_stage(IntentStage::Qualifying);
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        state.set_field(FieldId::Timeline, FieldValue::Given("in_3_months".into()));

        let parts = composer.build_context("bold please", &mut state, false);
        let joined = parts.join("\n");
        assert!(joined.contains("name: Sam"));
        assert!(joined.contains("Ask EXACTLY"));
        // The next missing preferred field is coffee_style, so ask tracking moved
        assert_eq!(state.current_field_being_asked, Some(FieldId::CoffeeStyle));
    }

    #[test]
    fn test_contact_ask_marked_required_when_no_channel() {
        let composer = composer();
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.set_intent_stage(IntentStage::Qualifying);
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        for field in [
            FieldId::Timeline,
            FieldId::CoffeeStyle,
            FieldId::Equipment,
            FieldId::Volume,
        ] {
            state.set_field(field, FieldValue::Given("x".into()));
        }

        let parts = composer.build_context("ok", &mut state, false);
        let joined = parts.join("\n");
        assert!(joined.contains("phone OR email"));
        assert!(joined.contains("Ask EXACTLY (REQUIRED)"));
    }
}
