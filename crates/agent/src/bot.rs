//! Outbound bot orchestrator
//!
//! Coordinates the full turn: quick exits, parallel detection, the contact
//! sub-flow, early intents, flow-state dispatch, extraction/validation,
//! qualification completion, and the general response path. Keep this class
//! thin; step behavior lives in `flow::FlowController` and
//! `flow::ExtractionPipeline`.

use std::sync::Arc;
use std::time::Duration;

use cafe_agent_config::Settings;
use cafe_agent_core::{IntentStage, Turn, TurnOutcome};
use cafe_agent_llm::LlmBackend;
use cafe_agent_rag::Retriever;

use crate::composer::PromptComposer;
use crate::detection::{
    FlowClassifier, FlowDetection, FlowState, LlmFlowDetector, LlmQuestionIntent,
    LlmTypeDetector, QuestionRules, TypeClassifier, TypeDetection,
};
use crate::extraction::{ExtractionOutcome, FieldExtractor, LlmExtractor};
use crate::flow::{ContactFlow, ExtractionPipeline, FlowController, Qualifier};
use crate::questions::QuestionGenerator;
use crate::rag_support::AnswerHandler;
use crate::response::ResponseBuilder;
use crate::state::{ConversationState, FieldId, FieldValue};
use crate::validation::{EmailValidator, PermissiveChecker, PhoneValidator};
use crate::AgentError;

const GOODBYE_WORDS: &[&str] = &["bye", "goodbye", "see you", "talk later"];

/// Main orchestrator for the outbound (lead-generation) agent
pub struct OutboundBot {
    type_classifier: Arc<dyn TypeClassifier>,
    flow_classifier: Arc<dyn FlowClassifier>,
    extractor: Arc<dyn FieldExtractor>,
    controller: FlowController,
    pipeline: ExtractionPipeline,
    response_builder: ResponseBuilder,
    answer_handler: Arc<AnswerHandler>,
    questions: QuestionGenerator,
    detection_stagger: Duration,
    default_country: String,
}

impl OutboundBot {
    /// Production wiring: every port backed by the given LLM backend
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        retriever: Arc<Retriever>,
        settings: &Settings,
    ) -> Self {
        let extractor: Arc<dyn FieldExtractor> = Arc::new(LlmExtractor::new(backend.clone()));
        let type_classifier: Arc<dyn TypeClassifier> =
            Arc::new(LlmTypeDetector::new(backend.clone()));
        let flow_classifier: Arc<dyn FlowClassifier> =
            Arc::new(LlmFlowDetector::new(backend.clone()));
        Self::with_components(
            backend,
            retriever,
            settings,
            type_classifier,
            flow_classifier,
            extractor,
        )
    }

    /// Wiring with injected classifier/extractor ports (used by tests)
    pub fn with_components(
        backend: Arc<dyn LlmBackend>,
        retriever: Arc<Retriever>,
        settings: &Settings,
        type_classifier: Arc<dyn TypeClassifier>,
        flow_classifier: Arc<dyn FlowClassifier>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        let phone_validator = PhoneValidator::new(settings.agent.default_country.clone());
        let email_validator = Arc::new(EmailValidator::new(Arc::new(PermissiveChecker)));
        let answer_handler = Arc::new(AnswerHandler::new(retriever.clone(), backend.clone()));

        let contact_flow = ContactFlow::new(
            phone_validator.clone(),
            email_validator.clone(),
            extractor.clone(),
        );
        let qualifier = Qualifier::new(phone_validator.clone(), email_validator.clone());
        let controller = FlowController::new(
            contact_flow,
            qualifier,
            answer_handler.clone(),
            LlmQuestionIntent::new(backend.clone()),
            email_validator.clone(),
            extractor.clone(),
        );
        let pipeline =
            ExtractionPipeline::new(extractor.clone(), phone_validator, email_validator);
        let response_builder =
            ResponseBuilder::new(backend, PromptComposer::new(retriever));

        Self {
            type_classifier,
            flow_classifier,
            extractor,
            controller,
            pipeline,
            response_builder,
            answer_handler,
            questions: QuestionGenerator::new(),
            detection_stagger: Duration::from_millis(settings.agent.detection_stagger_ms),
            default_country: settings.agent.default_country.clone(),
        }
    }

    /// Process one user message against the stored conversation state
    ///
    /// `conversation_data` is the caller's persisted mapping; it is mutated
    /// in place and must be stored again after the call.
    pub async fn process_message(
        &self,
        user_message: &str,
        history: &[Turn],
        conversation_data: &mut serde_json::Value,
        country_code: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = ConversationState::from_value(conversation_data)?;
        if state.country_code.is_empty() {
            state.country_code = if country_code.is_empty() {
                self.default_country.clone()
            } else {
                country_code.to_string()
            };
        }

        let result = self.run_turn(user_message, history, &mut state).await;

        // State is written back on every path, including errors, so a failed
        // response generation never loses collected data
        state.write_to(conversation_data)?;
        result
    }

    async fn run_turn(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> Result<TurnOutcome, AgentError> {
        let message_lower = user_message.to_lowercase();

        // Goodbye ends the conversation before anything else runs
        if GOODBYE_WORDS.iter().any(|w| message_lower.contains(w)) {
            return Ok(TurnOutcome::end("Goodbye! Have a nice day!"));
        }

        // Post-qualification closure runs before detection so "ok" after
        // qualification doesn't reset the stage
        if state.is_qualified {
            if let Some(outcome) =
                self.controller.handle_post_qualification_flow(user_message, state)
            {
                tracing::info!(should_end = outcome.should_end, "Post-qualification exit");
                return Ok(outcome);
            }
        }

        let (type_detection, flow_detection, early_extraction) =
            self.run_parallel_detection(user_message, history, state).await;

        // Hand-off requests and the active contact sub-flow
        if let Some(outcome) = self
            .controller
            .handle_contact_flow(user_message, history, state)
            .await
        {
            return Ok(outcome);
        }

        if let Some(outcome) = self
            .controller
            .handle_early_flow(user_message, history, state, type_detection.as_ref())
            .await
        {
            return Ok(outcome);
        }

        if let Some(outcome) = self
            .dispatch_flow_state(user_message, state, &flow_detection)
            .await
        {
            return Ok(outcome);
        }

        if let Some(outcome) = self.controller.handle_casual_browser(user_message, state).await {
            return Ok(outcome);
        }

        self.controller
            .handle_intent_detection(user_message, history, state, type_detection.as_ref())
            .await;

        if let Some(outcome) =
            self.controller.handle_email_typo_confirmation(user_message, state)
        {
            return Ok(outcome);
        }

        if let Some(outcome) = self
            .controller
            .handle_rag_during_qualification(user_message, history, state)
            .await
        {
            return Ok(outcome);
        }

        // Qualified users and early-stage explorers get questions answered
        // naturally, no redirect
        if state.is_qualified
            || matches!(
                state.intent_stage,
                IntentStage::Exploring | IntentStage::InterestDetected
            )
        {
            if QuestionRules::is_question(user_message) {
                let outcome = self
                    .answer_handler
                    .answer_unlimited(user_message, Some(state))
                    .await;
                return Ok(outcome);
            }
        }

        self.controller.handle_commitment_upgrade(state);

        if let Some(outcome) = self
            .pipeline
            .process(user_message, history, state, early_extraction)
            .await
        {
            return Ok(outcome);
        }

        // Extraction may have landed a commitment signal
        self.controller.handle_commitment_upgrade(state);

        if let Some(outcome) = self.controller.evaluate_qualification_completion(state) {
            return Ok(outcome);
        }

        let use_rag_instruction = state.customer_type.is_none();
        let just_provided = self.just_provided_contact(user_message, state);
        let response = self
            .response_builder
            .generate(user_message, history, state, use_rag_instruction, &just_provided)
            .await?;

        Ok(TurnOutcome::reply(response))
    }

    /// Fan out the classification calls this turn needs
    ///
    /// Calls are dispatched concurrently with a short fixed stagger between
    /// them - upstream API pacing, not a logical dependency.
    async fn run_parallel_detection(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> (
        Option<TypeDetection>,
        FlowDetection,
        Option<ExtractionOutcome>,
    ) {
        let current_field = self.current_field(state);
        let style_known = state.is_set(FieldId::CurrentCoffeeStyle);

        match state.customer_type {
            Some(customer_type) => {
                if state.can_start_qualification() && !state.is_qualified {
                    tracing::info!("Running parallel detection: flow + extraction");
                    let flow_fut =
                        self.flow_classifier.classify(user_message, history, current_field);
                    let extraction_fut = async {
                        tokio::time::sleep(self.detection_stagger).await;
                        self.extractor
                            .extract(user_message, Some(customer_type), history, style_known)
                            .await
                    };
                    let (flow, extraction) = tokio::join!(flow_fut, extraction_fut);
                    (None, flow, Some(extraction))
                } else {
                    tracing::info!("Running detection: flow state only");
                    let flow = self
                        .flow_classifier
                        .classify(user_message, history, current_field)
                        .await;
                    (None, flow, None)
                }
            },
            None => {
                tracing::info!("Running parallel detection: customer type + extraction");
                let type_fut = self.type_classifier.classify(user_message, history);
                let extraction_fut = async {
                    tokio::time::sleep(self.detection_stagger).await;
                    // Unknown type restricts extraction to contact info
                    self.extractor.extract(user_message, None, history, style_known).await
                };
                let (type_detection, extraction) = tokio::join!(type_fut, extraction_fut);
                (
                    type_detection,
                    FlowDetection::continuing("Intent not yet confirmed"),
                    Some(extraction),
                )
            },
        }
    }

    fn current_field(&self, state: &mut ConversationState) -> Option<FieldId> {
        let ct = state.customer_type?;
        if state.can_start_qualification() && !state.is_qualified {
            state.missing_fields(ct).first().copied()
        } else {
            None
        }
    }

    async fn dispatch_flow_state(
        &self,
        user_message: &str,
        state: &mut ConversationState,
        detection: &FlowDetection,
    ) -> Option<TurnOutcome> {
        match detection.state {
            FlowState::Continuing => None,
            FlowState::WantsToExit => {
                tracing::info!(reasoning = %detection.reasoning, "User wants to exit");
                state.reset_to_exploration();
                Some(TurnOutcome::reply(
                    "No problem! Feel free to ask me anything about Abbotsford Road Coffee.",
                ))
            },
            FlowState::RefusesContactInfo => {
                tracing::info!(reasoning = %detection.reasoning, "User refuses contact info");
                self.handle_contact_refusal(state)
            },
            FlowState::AskingQuestion => {
                tracing::info!(reasoning = %detection.reasoning, "User asking during qualification");
                if !QuestionRules::is_question(user_message) {
                    return None;
                }
                let ct = state.customer_type?;
                let next_question = state
                    .missing_fields(ct)
                    .first()
                    .map(|f| self.questions.field_question(*f))
                    .unwrap_or_default();
                Some(
                    self.answer_handler
                        .handle_rag_question(user_message, state, &next_question)
                        .await,
                )
            },
        }
    }

    /// Infer which channel was refused and offer the alternate one
    fn handle_contact_refusal(&self, state: &mut ConversationState) -> Option<TurnOutcome> {
        let ct = state.customer_type?;
        let current_field = state.current_field_being_asked;
        let missing = state.missing_fields(ct);
        let needs_phone = missing.contains(&FieldId::Phone);
        let needs_email = missing.contains(&FieldId::Email);
        let has_phone = state.is_set(FieldId::Phone);
        let has_email = state.is_set(FieldId::Email);

        let refusing_phone =
            current_field == Some(FieldId::Phone) || (needs_phone && !has_phone && !has_email);
        let refusing_email =
            current_field == Some(FieldId::Email) || (needs_email && !has_email && !has_phone);

        if refusing_phone {
            state.track_contact_refusal(FieldId::Phone);
            if !has_email && needs_email {
                tracing::info!("Phone refused - offering email instead");
                state.set_field(FieldId::Phone, FieldValue::Declined);
                state.reset_field_tracking();
                return Some(TurnOutcome::reply(
                    "I understand! Would you prefer to share your email instead so our \
                     team can reach out?",
                ));
            }
            if has_email {
                state.set_field(FieldId::Phone, FieldValue::Declined);
                state.reset_field_tracking();
                if state.is_complete(ct) {
                    return Some(TurnOutcome::reply(
                        "No worries! We'll use your email to connect. Is there anything \
                         else you'd like to know?",
                    ));
                }
                let next = state.missing_fields(ct).first().copied()?;
                let question = self.questions.field_question(next);
                return Some(TurnOutcome::reply(format!("No worries! {}", question)));
            }
        } else if refusing_email {
            state.track_contact_refusal(FieldId::Email);
            if !has_phone && needs_phone {
                tracing::info!("Email refused - offering phone instead");
                state.set_field(FieldId::Email, FieldValue::Declined);
                state.reset_field_tracking();
                return Some(TurnOutcome::reply(
                    "No problem! Would you prefer to share your phone number instead?",
                ));
            }
            if has_phone {
                state.set_field(FieldId::Email, FieldValue::Declined);
                state.reset_field_tracking();
                if state.is_complete(ct) {
                    return Some(TurnOutcome::reply(
                        "No problem! We'll use your phone to connect. Is there anything \
                         else you'd like to know?",
                    ));
                }
                let next = state.missing_fields(ct).first().copied()?;
                let question = self.questions.field_question(next);
                return Some(TurnOutcome::reply(format!("No problem! {}", question)));
            }
        }

        // Refusing everything: fall back to free exploration
        state.reset_to_exploration();
        Some(TurnOutcome::reply(
            "No worries! Would you like to just explore and learn more about our coffee \
             for now?",
        ))
    }

    fn just_provided_contact(
        &self,
        user_message: &str,
        state: &ConversationState,
    ) -> Vec<String> {
        let lower = user_message.to_lowercase();
        let mut provided = Vec::new();

        if let Some(name) = state.given_value(FieldId::Name) {
            if ["i'm", "im ", "my name", "name is"].iter().any(|p| lower.contains(p)) {
                provided.push(format!("name ({})", name));
            }
        }
        if let Some(email) = state.given_value(FieldId::Email) {
            if user_message.contains('@') || lower.contains("email") {
                provided.push(format!("email ({})", email));
            }
        }
        if let Some(phone) = state.given_value(FieldId::Phone) {
            if user_message.chars().any(|c| c.is_ascii_digit()) {
                provided.push(format!("phone ({})", phone));
            }
        }
        provided
    }
}
