//! Stepwise flow handling for outbound conversations
//!
//! Encapsulates the per-step decision handlers the orchestrator sequences:
//! human hand-off, early intents, casual browsing, intent detection, the
//! email-typo loop, RAG during qualification, commitment upgrade, and final
//! qualification completion. Each handler updates state explicitly and
//! returns an early reply when the turn should stop there.

use std::sync::Arc;

use cafe_agent_core::{last_bot_message, CustomerType, IntentStage, Turn, TurnOutcome};

use crate::detection::question::is_ambiguous_for_rules;
use crate::detection::{Confidence, LlmQuestionIntent, QuestionRules, TypeDetection};
use crate::extraction::heuristics::detect_human_connection_request;
use crate::extraction::FieldExtractor;
use crate::flow::contact::ContactFlow;
use crate::flow::qualify::{timeline_phrase, QualificationOutcome, Qualifier};
use crate::questions::QuestionGenerator;
use crate::rag_support::AnswerHandler;
use crate::state::{ContactPurpose, ConversationState, FieldId, FieldValue};
use crate::validation::{EmailValidation, EmailValidator};

/// Phrases that flag a no-pressure browser
const CASUAL_PHRASES: &[&str] = &[
    "just browsing",
    "just looking",
    "just curious",
    "just exploring",
    "just checking",
    "just want to know",
    "just wondering",
    "no commitment",
    "not ready",
    "not sure yet",
    "maybe later",
];

/// Phrases asking for information before sharing personal details
const DETAILS_FIRST_PHRASES: &[&str] = &[
    "want to know more details",
    "would like to know more",
    "more details",
    "details first",
    "information first",
    "before providing",
    "before giving",
    "first i would like",
    "want details",
    "need more information",
    "tell me more first",
    "know more about",
];

const NAME_ASK_PHRASES: &[&str] = &[
    "who am i chatting with",
    "what's your name",
    "what is your name",
    "who am i talking to",
    "what should i call you",
];

/// Encapsulates stepwise flow handling for outbound conversations
pub struct FlowController {
    contact_flow: ContactFlow,
    qualifier: Qualifier,
    answer_handler: Arc<AnswerHandler>,
    question_intent: LlmQuestionIntent,
    questions: QuestionGenerator,
    email_validator: Arc<EmailValidator>,
    extractor: Arc<dyn FieldExtractor>,
}

impl FlowController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contact_flow: ContactFlow,
        qualifier: Qualifier,
        answer_handler: Arc<AnswerHandler>,
        question_intent: LlmQuestionIntent,
        email_validator: Arc<EmailValidator>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        Self {
            contact_flow,
            qualifier,
            answer_handler,
            question_intent,
            questions: QuestionGenerator::new(),
            email_validator,
            extractor,
        }
    }

    /// Hand-off requests and the active contact sub-flow
    pub async fn handle_contact_flow(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        if state.contact_stage.is_none() && detect_human_connection_request(user_message) {
            tracing::info!("User requested human connection");
            return Some(self.contact_flow.enter(state, ContactPurpose::HumanConnection));
        }

        self.contact_flow.advance(user_message, history, state).await
    }

    /// Early intents: details-before-name and order requests
    pub async fn handle_early_flow(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        type_detection: Option<&TypeDetection>,
    ) -> Option<TurnOutcome> {
        let lower = user_message.to_lowercase();

        // Users who want details before sharing their name get them
        let wants_details_first = DETAILS_FIRST_PHRASES.iter().any(|p| lower.contains(p));
        let bot_asked_for_name = last_bot_message(history)
            .map(|m| {
                let bot_lower = m.to_lowercase();
                NAME_ASK_PHRASES.iter().any(|p| bot_lower.contains(p))
            })
            .unwrap_or(false);
        let is_early_conversation = history.len() <= 3;

        if wants_details_first && (bot_asked_for_name || is_early_conversation) {
            tracing::info!("User wants details before providing name");
            return Some(TurnOutcome::reply(
                "We support cafés in three ways: helping new cafés with coffee selection, \
                 equipment, and training; supporting existing cafés with quality \
                 improvement and growth; and answering any coffee questions. We offer \
                 seven signature blends, commercial equipment, hands-on training, and \
                 ongoing support. What would you like to know more about?",
            ));
        }

        // Order requests are caught in every stage, not just qualification
        let wants_order = type_detection.map(|d| d.wants_to_place_order).unwrap_or(false)
            || state.wants_to_place_order;
        if !wants_order {
            return None;
        }

        let is_first_request = !state.wants_to_place_order;
        if is_first_request {
            tracing::info!("User wants to place an order");
            state.wants_to_place_order = true;
            state.order_details = Some(user_message.to_string());
        }

        if state.has_actual_phone() || state.has_actual_email() {
            let contact = state
                .given_value(FieldId::Phone)
                .filter(|p| p.starts_with('+'))
                .or_else(|| state.given_value(FieldId::Email))
                .unwrap_or_default()
                .to_string();
            return Some(TurnOutcome::reply(format!(
                "Awesome! I've noted your request. Our team will reach out to you at {} \
                 to process your order. They'll get back to you shortly!",
                contact
            )));
        }

        // First request without contact info enters the shared contact flow;
        // later turns are advanced by handle_contact_flow
        if is_first_request && state.contact_stage.is_none() {
            return Some(self.contact_flow.enter(state, ContactPurpose::Order));
        }

        None
    }

    /// Casual browsers stay in free exploration indefinitely
    pub async fn handle_casual_browser(
        &self,
        user_message: &str,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        if state.customer_type.is_some() {
            return None;
        }
        let lower = user_message.to_lowercase();
        if !CASUAL_PHRASES.iter().any(|p| lower.contains(p)) {
            return None;
        }

        tracing::info!("User is a casual browser - staying in exploration mode");
        if QuestionRules::is_question(user_message) {
            let mut outcome = self.answer_handler.answer_unlimited(user_message, Some(state)).await;
            outcome.response = format!("Cool! No pressure. {}", outcome.response);
            return Some(outcome);
        }

        Some(TurnOutcome::reply(
            "No worries! Browse away. What would you like to know about our coffee?",
        ))
    }

    /// Two-tier customer-type confirmation
    ///
    /// High confidence confirms intent immediately; medium parks the user in
    /// `InterestDetected` until a commitment signal appears. Premature
    /// qualification on a vague intent is worse than a delayed start.
    pub async fn handle_intent_detection(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        detection: Option<&TypeDetection>,
    ) {
        if state.customer_type.is_some() {
            return;
        }
        let detection = match detection {
            Some(detection) => detection,
            None => return,
        };

        Self::apply_contact_info(state, detection);

        let detected_type = match detection.customer_type {
            Some(t) => t,
            None => {
                tracing::info!("Customer type unclear - staying in exploration");
                return;
            },
        };

        match detection.confidence {
            Confidence::High => {
                state.customer_type = Some(detected_type);
                state.set_intent_stage(IntentStage::IntentConfirmed);
                tracing::info!(
                    customer_type = %detected_type,
                    reasoning = %detection.reasoning,
                    "Intent confirmed (high confidence)"
                );
                self.re_extract_with_type(user_message, history, state, detected_type)
                    .await;
            },
            Confidence::Medium => {
                state.customer_type = Some(detected_type);
                state.set_intent_stage(IntentStage::InterestDetected);
                tracing::info!(
                    customer_type = %detected_type,
                    reasoning = %detection.reasoning,
                    "Interest detected (medium confidence)"
                );
            },
            Confidence::Low => {
                tracing::info!("Low confidence detection - staying in exploration");
            },
        }
    }

    fn apply_contact_info(state: &mut ConversationState, detection: &TypeDetection) {
        let contact = &detection.contact_info;
        if let Some(name) = contact.name.as_deref() {
            if !state.is_set(FieldId::Name) {
                state.set_field(FieldId::Name, FieldValue::Given(name.to_string()));
            }
        }
        if let Some(phone) = contact.phone.as_deref() {
            if !state.is_set(FieldId::Phone) {
                state.set_field(FieldId::Phone, FieldValue::Given(phone.to_string()));
            }
        }
        if let Some(email) = contact.email.as_deref() {
            if !state.is_set(FieldId::Email) {
                state.set_field(FieldId::Email, FieldValue::Given(email.to_string()));
            }
        }
    }

    /// Once the type is confirmed, re-read the current and latest prior user
    /// message; the parallel pass ran with extraction restricted to contact
    /// info.
    async fn re_extract_with_type(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        customer_type: CustomerType,
    ) {
        let style_known = state.is_set(FieldId::CurrentCoffeeStyle);
        let current = self
            .extractor
            .extract(user_message, Some(customer_type), history, style_known)
            .await;
        for (field, value) in &current.fields {
            if !state.is_set(*field) {
                state.set_field(*field, FieldValue::from_raw(value));
                tracing::info!(field = %field, %value, "Re-extracted with confirmed type");
            }
        }

        let prev_user = history
            .iter()
            .rev()
            .take(3)
            .find(|t| t.role == cafe_agent_core::TurnRole::User)
            .map(|t| t.content.clone());
        if let Some(prev) = prev_user {
            let previous = self
                .extractor
                .extract(&prev, Some(customer_type), history, style_known)
                .await;
            for (field, value) in &previous.fields {
                if !state.is_set(*field) {
                    state.set_field(*field, FieldValue::from_raw(value));
                    tracing::info!(field = %field, %value, "Extracted from previous message");
                }
            }
        }
    }

    /// Confirm or reject a suggested email-typo correction
    pub fn handle_email_typo_confirmation(
        &self,
        user_message: &str,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let suggested = state.email_typo_suggested.clone()?;
        if state.is_set(FieldId::Email) {
            return None;
        }

        let lower = user_message.trim().to_lowercase();
        let confirmed = [
            "yes", "yeah", "yep", "correct", "right", "that's right", "yup", "y",
        ]
        .contains(&lower.as_str());
        let rejected = ["no", "nope", "nah", "n"].contains(&lower.as_str());

        if confirmed {
            if let EmailValidation::Valid { normalized } = self.email_validator.validate(&suggested)
            {
                tracing::info!(email = %normalized, "User confirmed typo correction");
                state.set_field(FieldId::Email, FieldValue::Given(normalized));
                state.email_typo_suggested = None;

                if let Some(ct) = state.customer_type {
                    let missing = state.missing_fields(ct);
                    if let Some(next) = missing.first() {
                        let question = self.questions.field_question(*next);
                        return Some(TurnOutcome::reply(format!("Perfect! {}", question)));
                    }
                }
                return Some(TurnOutcome::reply("Great! Let me get your details together."));
            }
            return None;
        }

        if user_message.contains('@') {
            // They typed a fresh address; let extraction pick it up
            state.email_typo_suggested = None;
            return None;
        }

        if rejected {
            state.email_typo_suggested = None;
            return Some(TurnOutcome::reply("No worries! What's the correct email?"));
        }

        None
    }

    /// Upgrade interest to confirmed intent once a commitment signal lands
    pub fn handle_commitment_upgrade(&self, state: &mut ConversationState) {
        if state.intent_stage != IntentStage::InterestDetected {
            return;
        }
        let ct = match state.customer_type {
            Some(ct) => ct,
            None => return,
        };
        let has_commitment = FieldId::commitment_signals(ct)
            .iter()
            .any(|f| state.is_set(*f));
        if has_commitment {
            tracing::info!("Commitment signal detected - upgrading to intent_confirmed");
            state.set_intent_stage(IntentStage::IntentConfirmed);
        }
    }

    /// Knowledge questions asked mid-qualification get an answer + redirect
    pub async fn handle_rag_during_qualification(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let ct = state.customer_type?;
        if !state.can_start_qualification() || state.is_qualified {
            return None;
        }

        let last_bot = last_bot_message(history).unwrap_or("").to_string();
        let by_rules = QuestionRules::is_question(user_message);
        let is_answering = QuestionRules::is_answering_field(
            user_message,
            &last_bot,
            state.current_field_being_asked,
        );

        let mut is_question = by_rules;
        if is_ambiguous_for_rules(user_message, &last_bot, by_rules, is_answering) {
            if let Some(intent) = self.question_intent.detect(user_message, &last_bot).await {
                if matches!(intent.confidence, Confidence::High | Confidence::Medium) {
                    is_question = intent.is_question;
                }
            }
        }

        if !is_question || is_answering {
            return None;
        }

        let missing = state.missing_fields(ct);
        let next_question = missing
            .first()
            .map(|f| self.questions.field_question(*f))
            .unwrap_or_default();
        Some(
            self.answer_handler
                .handle_rag_question(user_message, state, &next_question)
                .await,
        )
    }

    /// Closure handling once the user is qualified (or deep in the flow)
    pub fn handle_post_qualification_flow(
        &self,
        user_message: &str,
        state: &ConversationState,
    ) -> Option<TurnOutcome> {
        let in_advanced_stage = matches!(
            state.intent_stage,
            IntentStage::Qualifying | IntentStage::IntentConfirmed
        );
        if !state.is_qualified && !in_advanced_stage {
            return None;
        }

        let lower = user_message.trim().to_lowercase();
        let word_count = lower.split_whitespace().count();

        const EXIT_PHRASES: &[&str] = &[
            "no",
            "nope",
            "nah",
            "nothing",
            "none",
            "that's it",
            "that's all",
            "im good",
            "i'm good",
            "all good",
        ];
        const ACKNOWLEDGMENTS: &[&str] = &[
            "ok",
            "okay",
            "k",
            "thanks",
            "thank you",
            "great",
            "perfect",
            "sounds good",
            "got it",
            "alright",
            "cool",
        ];

        let is_acknowledgment = word_count <= 3
            && ACKNOWLEDGMENTS.iter().any(|p| {
                lower == *p
                    || lower.starts_with(&format!("{} ", p))
                    || lower.ends_with(&format!(" {}", p))
            });
        let has_exit_phrase = EXIT_PHRASES.iter().any(|p| lower.contains(p));

        if word_count >= 10 || (!has_exit_phrase && !is_acknowledgment) {
            return None;
        }

        tracing::info!(qualified = state.is_qualified, "User indicated conversation closure");

        let name_part = state
            .given_value(FieldId::Name)
            .map(|n| format!(", {}", n))
            .unwrap_or_default();
        let contact_part = state
            .given_value(FieldId::Phone)
            .map(|p| format!(" at {}", crate::validation::format_phone_for_display(p)))
            .or_else(|| state.given_value(FieldId::Email).map(|e| format!(" at {}", e)))
            .unwrap_or_default();

        let response = if is_acknowledgment {
            format!(
                "Perfect! Our team will be in touch soon{}. Looking forward to connecting \
                 with you!",
                contact_part
            )
        } else {
            format!(
                "No worries{}! We're all set. Our team will contact you soon{}. If you \
                 think of anything else, just message me anytime!",
                name_part, contact_part
            )
        };

        Some(TurnOutcome::end(response))
    }

    /// Final qualification check; fires once everything required is present
    pub fn evaluate_qualification_completion(
        &self,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let ct = state.customer_type?;
        if !state.can_start_qualification() || state.is_qualified || !state.is_complete(ct) {
            return None;
        }

        match self.qualifier.evaluate(state) {
            QualificationOutcome::Qualified(lead) => {
                state.is_qualified = true;
                state.set_intent_stage(IntentStage::Qualified);

                let message = match ct {
                    CustomerType::NewCafe => {
                        let timeline = timeline_phrase(state.given_value(FieldId::Timeline));
                        format!(
                            "This is going to be amazing, {}! Opening {}—so exciting! Our \
                             team will reach out soon to help bring your café to life. In \
                             the meantime, any other questions?",
                            lead.name, timeline
                        )
                    },
                    CustomerType::ExistingCafe => format!(
                        "Love it, {}! Our team will reach out soon to help take your café \
                         to the next level. In the meantime, what else can I help you with?",
                        lead.name
                    ),
                };
                Some(TurnOutcome::reply(message))
            },
            QualificationOutcome::ValidationFailed { field, message } => {
                // Re-ask the bad field with friendly copy instead of blocking
                tracing::info!(field = %field, "Qualification validation failed - re-asking");
                state.clear_field(field);
                Some(TurnOutcome::reply(message))
            },
            QualificationOutcome::Incomplete { .. } => None,
        }
    }
}
