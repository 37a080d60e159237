//! Extraction + validation pipeline
//!
//! Runs per-turn extraction, validates and normalizes each field, and
//! short-circuits with a clarification or follow-up question whenever one is
//! needed immediately. Returning `None` means the turn continues to response
//! generation.

use std::sync::Arc;

use cafe_agent_core::{last_bot_message, CustomerType, IntentStage, Turn, TurnOutcome};

use crate::extraction::heuristics::{
    detect_refusal, is_ambiguous_number, validate_extraction_consistency,
};
use crate::extraction::{extract_fallback, ExtractionOutcome, FieldExtractor};
use crate::questions::QuestionGenerator;
use crate::state::{ConversationState, EngagementLevel, FieldId, FieldValue};
use crate::validation::{
    extract_country_from_text, extract_phone_from_text, format_phone_for_display,
    is_vague_pain_point, validate_name, EmailValidation, EmailValidator, PhoneValidator,
};

/// Handles field extraction, validation/normalization, and clarifications
pub struct ExtractionPipeline {
    extractor: Arc<dyn FieldExtractor>,
    phone_validator: PhoneValidator,
    email_validator: Arc<EmailValidator>,
    questions: QuestionGenerator,
}

impl ExtractionPipeline {
    pub fn new(
        extractor: Arc<dyn FieldExtractor>,
        phone_validator: PhoneValidator,
        email_validator: Arc<EmailValidator>,
    ) -> Self {
        Self {
            extractor,
            phone_validator,
            email_validator,
            questions: QuestionGenerator::new(),
        }
    }

    /// Run extraction + validation; `Some` is an immediate reply
    pub async fn process(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        early_extraction: Option<ExtractionOutcome>,
    ) -> Option<TurnOutcome> {
        state.track_user_engagement(user_message);

        // Disengaged users get a shortcut offer instead of more questions
        if state.user_engagement_level == EngagementLevel::Low
            && state.can_start_qualification()
        {
            tracing::info!("Low engagement - offering to simplify");
            return Some(TurnOutcome::reply(
                "I sense you might want to keep things simple. Would you like me to just \
                 get your contact info so our team can reach out directly?",
            ));
        }

        // Phone confirmation comes before extraction so "yes" isn't
        // misread as an answer to some other field
        if state.pending_phone_confirmation.is_some() && !state.is_set(FieldId::Phone) {
            return self.handle_phone_confirmation(user_message, state);
        }

        if !self.should_extract(state) {
            tracing::debug!("Skipping extraction - contact collected and not qualifying");
            return None;
        }

        let extraction = match early_extraction {
            Some(extraction) => {
                tracing::debug!("Using parallel-extracted fields");
                extraction
            },
            None => {
                let customer_type = state.customer_type.or(Some(CustomerType::NewCafe));
                let style_known = state.is_set(FieldId::CurrentCoffeeStyle);
                self.extractor
                    .extract(user_message, customer_type, history, style_known)
                    .await
            },
        };

        state.email_preference_indicated |= extraction.email_preference_indicated;
        state.phone_preference_indicated |= extraction.phone_preference_indicated;

        // Active qualification starts with the first extraction pass
        if state.can_start_qualification()
            && !state.is_qualified
            && state.intent_stage == IntentStage::IntentConfirmed
        {
            state.set_intent_stage(IntentStage::Qualifying);
        }

        // Order flow mirrors the talk-to-person behavior on email refusal
        if state.wants_to_place_order
            && state.is_set(FieldId::Phone)
            && !state.is_set(FieldId::Email)
            && detect_refusal(user_message)
        {
            state.track_contact_refusal(FieldId::Email);
            state.set_field(FieldId::Email, FieldValue::Declined);
            let display = state
                .given_value(FieldId::Phone)
                .map(format_phone_for_display)
                .unwrap_or_else(|| "your phone".to_string());
            return Some(TurnOutcome::reply(format!(
                "No problem! We'll use {} to connect. Is there anything else you'd like \
                 to know?",
                display
            )));
        }

        if let Some(outcome) = self
            .store_extracted_fields(user_message, state, &extraction)
            .await
        {
            return Some(outcome);
        }

        // A number parked waiting for its country
        if state.pending_phone.is_some() && !state.is_set(FieldId::Phone) {
            if let Some(outcome) = self.handle_pending_phone_country(user_message, state) {
                return Some(outcome);
            }
        }

        // Nothing extracted but the bot just asked something: keyword fallback
        if extraction.is_empty() {
            if let Some(outcome) = self.try_fallback(user_message, history, state) {
                return Some(outcome);
            }
        }

        if let Some(outcome) = self.recover_preference_indication(user_message, state) {
            return Some(outcome);
        }

        // Answering any field ends the question streak
        if !extraction.is_empty() && state.rag_questions_count > 0 {
            tracing::info!(
                previous = state.rag_questions_count,
                "User answered a field - resetting RAG counter"
            );
            state.reset_rag_count();
        }

        None
    }

    fn should_extract(&self, state: &ConversationState) -> bool {
        let contact_incomplete = !state.is_set(FieldId::Name)
            || !state.is_set(FieldId::Phone)
            || !state.is_set(FieldId::Email);

        if state.customer_type.is_some() {
            (state.can_start_qualification() && !state.is_qualified) || contact_incomplete
        } else {
            // Contact info is captured whenever it's volunteered, even while
            // exploring or ordering without a detected type
            state.wants_to_place_order || contact_incomplete
        }
    }

    fn handle_phone_confirmation(
        &self,
        user_message: &str,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let lower = user_message.trim().to_lowercase();
        let affirmative = [
            "yes", "yeah", "yep", "correct", "right", "that's right", "yup", "sure", "ok",
            "okay",
        ]
        .iter()
        .any(|w| lower.contains(w));

        if affirmative {
            let confirmed = state.pending_phone_confirmation.take()?;
            tracing::info!(phone = %confirmed, "Phone confirmed by user");
            state.set_field(FieldId::Phone, FieldValue::Given(confirmed));
            state.reset_phone_attempts();
            return self.after_phone_collected(state);
        }

        // Maybe they typed a corrected number with a country code
        if let Some(new_phone) = extract_phone_from_text(user_message) {
            if new_phone.starts_with('+') || user_message.contains('+') {
                if let Ok(validated) = self.phone_validator.validate_and_format(
                    &new_phone,
                    Some(state.country_code.as_str()),
                    Some(user_message),
                ) {
                    tracing::info!(phone = %validated.e164, "User provided corrected phone");
                    state.country_code = validated.country;
                    state.set_field(FieldId::Phone, FieldValue::Given(validated.e164));
                    state.pending_phone_confirmation = None;
                    state.reset_phone_attempts();
                    return self.after_phone_collected(state);
                }
            }
        }

        state.pending_phone_confirmation = None;
        Some(TurnOutcome::reply(
            "No problem! Please provide your phone number with the country code \
             (e.g., +1 555-123-4567 for US).",
        ))
    }

    /// Follow-ups shared by the confirmation and correction paths
    fn after_phone_collected(&self, state: &mut ConversationState) -> Option<TurnOutcome> {
        if !state.is_set(FieldId::Email)
            && (state.can_start_qualification() || state.wants_to_place_order)
            && !state.human_connection_confirmed
        {
            return Some(TurnOutcome::reply(
                "Awesome, thanks for confirming! Just to be safe, what's your email in \
                 case we can't reach you by phone?",
            ));
        }

        if let Some(ct) = state.customer_type {
            if state.is_complete(ct) {
                tracing::info!("Qualification complete after phone confirmation");
                state.is_qualified = true;
                state.set_intent_stage(IntentStage::Qualified);
                return Some(self.completion_reply(state));
            }
        }

        self.next_field_question(state, "Perfect!")
    }

    fn completion_reply(&self, state: &ConversationState) -> TurnOutcome {
        let name = state.given_value(FieldId::Name).unwrap_or("there");
        let contact = state
            .given_value(FieldId::Email)
            .map(str::to_string)
            .or_else(|| state.given_value(FieldId::Phone).map(format_phone_for_display))
            .unwrap_or_default();
        TurnOutcome::reply(format!(
            "Perfect! I've got all your details, {}. Our team will reach out to you at {}. \
             Is there anything else you'd like to know about our coffee?",
            name, contact
        ))
    }

    fn next_field_question(
        &self,
        state: &mut ConversationState,
        prefix: &str,
    ) -> Option<TurnOutcome> {
        if state.human_connection_confirmed {
            return None;
        }
        let ct = state.customer_type?;
        let mut missing = state.missing_fields(ct);
        missing.retain(|f| !state.was_topic_discussed(f.as_str()));
        let next = *missing.first()?;
        let question = self.questions.field_question(next);
        Some(TurnOutcome::reply(format!("{} {}", prefix, question)))
    }

    async fn store_extracted_fields(
        &self,
        user_message: &str,
        state: &mut ConversationState,
        extraction: &ExtractionOutcome,
    ) -> Option<TurnOutcome> {
        for (field, raw_value) in &extraction.fields {
            let field = *field;
            if raw_value.is_empty() || state.is_set(field) {
                continue;
            }

            if !validate_extraction_consistency(user_message, field, raw_value) {
                continue;
            }

            if is_ambiguous_number(user_message, field) {
                let unit_question = match field {
                    FieldId::Volume => {
                        format!("{} what? Cups per day, or something else?", user_message.trim())
                    },
                    _ => format!(
                        "{} what? Days, weeks, months, or something else?",
                        user_message.trim()
                    ),
                };
                return Some(TurnOutcome::reply(unit_question));
            }

            let mut value = raw_value.clone();

            match field {
                FieldId::Name => match validate_name(&value) {
                    Ok(cleaned) => value = cleaned,
                    Err(_) => continue,
                },
                FieldId::Phone => {
                    match self.validate_phone_value(user_message, state, &value) {
                        PhoneStep::Store(normalized) => value = normalized,
                        PhoneStep::Reply(outcome) => return Some(outcome),
                        PhoneStep::Skip => continue,
                    }
                },
                FieldId::Email => {
                    match self.validate_email_value(state, &value) {
                        EmailStep::Store(normalized) => value = normalized,
                        EmailStep::Reply(outcome) => return Some(outcome),
                        EmailStep::Skip => continue,
                    }
                },
                FieldId::CurrentPainPoints => {
                    if value == "unclear" || is_vague_pain_point(&value) {
                        tracing::info!("Vague/unclear pain point - asking for specifics");
                        let question =
                            self.questions.clarification(FieldId::CurrentPainPoints, user_message);
                        return Some(TurnOutcome::reply(question));
                    }
                },
                FieldId::CoffeePreference => {
                    if value == "interested_unspecified" {
                        return Some(TurnOutcome::reply(
                            "What styles are you thinking about—bold, classic, specialty, \
                             or something specific?",
                        ));
                    }
                    if value == "unclear" {
                        state.set_field(FieldId::CoffeePreference, FieldValue::ToBeDiscussed);
                        return Some(TurnOutcome::reply(
                            "No worries! Our team can walk through all the options when \
                             they connect with you.",
                        ));
                    }
                },
                _ => {},
            }

            state.set_field(field, FieldValue::from_raw(&value));
            state.mark_topic_discussed(field.as_str(), &value);
            if value == "unclear" {
                state.mark_user_uncertain(field.as_str());
            }

            if let Some(outcome) = self.post_store_follow_up(state, field) {
                return Some(outcome);
            }
        }
        None
    }

    /// Order-flow acknowledgments, completion checks, and the email-backup ask
    fn post_store_follow_up(
        &self,
        state: &mut ConversationState,
        field: FieldId,
    ) -> Option<TurnOutcome> {
        if state.wants_to_place_order {
            if field == FieldId::Phone && !state.is_set(FieldId::Email) {
                return Some(TurnOutcome::reply(
                    "Perfect! Just to be safe, what's your email in case we can't reach \
                     you by phone?",
                ));
            }
            if field == FieldId::Email
                || (field == FieldId::Phone
                    && state.get_field(FieldId::Email) == Some(&FieldValue::Declined))
            {
                let contact = state
                    .given_value(FieldId::Email)
                    .map(str::to_string)
                    .or_else(|| {
                        state.given_value(FieldId::Phone).map(format_phone_for_display)
                    })?;
                tracing::info!(%contact, "Order flow contact collected");
                return Some(TurnOutcome::reply(format!(
                    "Awesome! I've noted your request. Our team will reach out to you at \
                     {} to process your order. They'll get back to you shortly!",
                    contact
                )));
            }
        }

        if field == FieldId::Phone || field == FieldId::Email {
            if let Some(ct) = state.customer_type {
                if state.is_complete(ct) && !state.is_qualified {
                    tracing::info!(field = %field, "Qualification complete after contact");
                    state.is_qualified = true;
                    state.set_intent_stage(IntentStage::Qualified);
                    return Some(self.completion_reply(state));
                }
            }
        }

        // After phone, ask for an email backup unless hand-off is done
        if field == FieldId::Phone
            && !state.is_set(FieldId::Email)
            && (state.can_start_qualification() || state.wants_to_place_order)
            && !state.human_connection_confirmed
        {
            return Some(TurnOutcome::reply(
                "Awesome, thanks for sharing your phone number! Just to be safe, what's \
                 your email in case we can't reach you by phone?",
            ));
        }

        None
    }

    fn validate_phone_value(
        &self,
        user_message: &str,
        state: &mut ConversationState,
        value: &str,
    ) -> PhoneStep {
        let in_collection_flow = (state.can_start_qualification() && !state.is_qualified)
            || state.wants_to_place_order;

        match self
            .phone_validator
            .validate_and_format(value, Some(state.country_code.as_str()), Some(user_message))
        {
            Ok(validated) => {
                let digits: String =
                    value.chars().filter(|c| c.is_ascii_digit()).collect();
                let has_explicit_country = value.starts_with('+')
                    || extract_country_from_text(user_message).is_some();

                if digits.len() == 10 && !has_explicit_country && in_collection_flow {
                    // Assumed-US numbers get confirmed before storage
                    let display = format_phone_for_display(&validated.e164);
                    state.pending_phone_confirmation = Some(validated.e164);
                    return PhoneStep::Reply(TurnOutcome::reply(format!(
                        "Is {} the best number to reach you? If not, please share your \
                         number with the country code.",
                        display
                    )));
                }

                state.reset_phone_attempts();
                state.country_code = validated.country;
                PhoneStep::Store(validated.e164)
            },
            Err(_) if in_collection_flow => {
                let attempts = state.increment_phone_attempts();
                if attempts == 1 {
                    let digits: String =
                        value.chars().filter(|c| c.is_ascii_digit()).collect();
                    if digits.len() == 10 {
                        let formatted_display = format!(
                            "+1 {} {} {}",
                            &digits[..3],
                            &digits[3..6],
                            &digits[6..]
                        );
                        state.pending_phone_confirmation = Some(format!("+1{}", digits));
                        return PhoneStep::Reply(TurnOutcome::reply(format!(
                            "Is {} the best number to reach you? If not, please share \
                             your number with the country code.",
                            formatted_display
                        )));
                    }
                    return PhoneStep::Reply(TurnOutcome::reply(
                        "I didn't catch that number. Could you share it again? (US \
                         numbers like 555-123-4567, or include +1 if you prefer)",
                    ));
                }

                // Repeated failures: keep the number for manual review rather
                // than looping forever
                state.flag_phone_for_review();
                state.reset_phone_attempts();
                let detected = extract_country_from_text(user_message)
                    .map(str::to_string)
                    .unwrap_or_else(|| state.country_code.clone());
                let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.len() >= 10 {
                    let prefix = match detected.as_str() {
                        "GB" => "+44",
                        "AU" => "+61",
                        "NZ" => "+64",
                        "IN" => "+91",
                        "CN" => "+86",
                        "JP" => "+81",
                        _ => "+1",
                    };
                    state.country_code = detected;
                    tracing::info!(phone = %format!("{}{}", prefix, digits), "Phone kept for manual review");
                    PhoneStep::Store(format!("{}{}", prefix, digits))
                } else {
                    PhoneStep::Skip
                }
            },
            Err(_) => {
                tracing::info!("Phone validation failed outside qualification - skipping");
                PhoneStep::Skip
            },
        }
    }

    fn validate_email_value(&self, state: &mut ConversationState, value: &str) -> EmailStep {
        let in_collection_flow = (state.can_start_qualification() && !state.is_qualified)
            || state.wants_to_place_order;

        match self.email_validator.validate(value) {
            EmailValidation::Valid { normalized } => {
                state.reset_email_attempts();
                EmailStep::Store(normalized)
            },
            EmailValidation::TypoSuspected { suggestion } if in_collection_flow => {
                let attempts = state.increment_email_attempts();
                if attempts == 1 {
                    state.set_email_typo_suggested(&suggestion);
                    EmailStep::Reply(TurnOutcome::reply(format!(
                        "I think you meant {}—is that right?",
                        suggestion
                    )))
                } else {
                    // Stop looping; store what they typed
                    state.reset_email_attempts();
                    EmailStep::Store(value.to_string())
                }
            },
            EmailValidation::Invalid { reason } if in_collection_flow => {
                let attempts = state.increment_email_attempts();
                if attempts == 1 {
                    EmailStep::Reply(TurnOutcome::reply(format!(
                        "{} Please share a valid email address.",
                        reason
                    )))
                } else {
                    state.reset_email_attempts();
                    EmailStep::Store(value.to_string())
                }
            },
            _ => {
                tracing::info!("Email validation failed outside qualification - skipping");
                EmailStep::Skip
            },
        }
    }

    fn handle_pending_phone_country(
        &self,
        user_message: &str,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let pending = state.pending_phone.clone()?;

        match extract_country_from_text(user_message) {
            Some(country) => {
                match self
                    .phone_validator
                    .validate_and_format(&pending, Some(country), None)
                {
                    Ok(validated) => {
                        state.country_code = country.to_string();
                        state.set_field(FieldId::Phone, FieldValue::Given(validated.e164));
                        state.pending_phone = None;
                        self.next_field_question(state, "Perfect!")
                    },
                    Err(e) => {
                        state.pending_phone = None;
                        Some(TurnOutcome::reply(e.user_message()))
                    },
                }
            },
            None => Some(TurnOutcome::reply(
                "I didn't catch the country. Is this a US number, or from another \
                 country? (like +1 for US, +44 for UK, etc.)",
            )),
        }
    }

    fn try_fallback(
        &self,
        user_message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let ct = state.customer_type?;
        let last_bot = last_bot_message(history)?.to_string();

        let has_contact = state.is_set(FieldId::Phone) && state.is_set(FieldId::Email);
        if state.is_qualified || has_contact {
            return None;
        }

        let missing = state.missing_fields(ct);
        let (field, raw) = extract_fallback(user_message, &last_bot, &missing)?;

        let value = match field {
            FieldId::Phone => {
                match self
                    .phone_validator
                    .validate_and_format(&raw, Some(state.country_code.as_str()), None)
                {
                    Ok(validated) => validated.e164,
                    Err(e) => return Some(TurnOutcome::reply(e.user_message())),
                }
            },
            FieldId::Email => match self.email_validator.validate(&raw) {
                EmailValidation::Valid { normalized } => normalized,
                EmailValidation::TypoSuspected { suggestion } => {
                    if state.email_typo_suggested.as_deref() != Some(suggestion.as_str()) {
                        state.set_email_typo_suggested(&suggestion);
                        return Some(TurnOutcome::reply(format!(
                            "I think you meant {}—is that right?",
                            suggestion
                        )));
                    }
                    return None;
                },
                EmailValidation::Invalid { reason } => {
                    return Some(TurnOutcome::reply(reason))
                },
            },
            _ => raw,
        };

        state.set_field(field, FieldValue::from_raw(&value));
        tracing::info!(field = %field, %value, "Fallback stored");
        None
    }

    /// The user said "email"/"phone" without giving one; recover the value
    fn recover_preference_indication(
        &self,
        user_message: &str,
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        if state.email_preference_indicated && !state.is_set(FieldId::Email) {
            if state.wants_to_place_order {
                // Order flow tries the raw message as an address first
                return Some(match self.email_validator.validate(user_message) {
                    EmailValidation::Valid { normalized } => {
                        state.set_field(FieldId::Email, FieldValue::Given(normalized.clone()));
                        TurnOutcome::reply(format!(
                            "Awesome! I've noted your request. Our team will reach out to \
                             you at {} to process your order. They'll get back to you \
                             shortly!",
                            normalized
                        ))
                    },
                    EmailValidation::TypoSuspected { suggestion } => {
                        state.set_email_typo_suggested(&suggestion);
                        TurnOutcome::reply(format!(
                            "I think you meant {}—is that right?",
                            suggestion
                        ))
                    },
                    EmailValidation::Invalid { reason } => TurnOutcome::reply(reason),
                });
            }
            state.email_preference_indicated = false;
            return Some(TurnOutcome::reply("Great! What's your email address?"));
        }

        if state.phone_preference_indicated && !state.is_set(FieldId::Phone) {
            if state.wants_to_place_order {
                return Some(
                    match self.phone_validator.validate_and_format(
                        user_message,
                        Some(state.country_code.as_str()),
                        Some(user_message),
                    ) {
                        Ok(validated) => {
                            state.country_code = validated.country;
                            state.set_field(FieldId::Phone, FieldValue::Given(validated.e164));
                            TurnOutcome::reply(
                                "Perfect! Just to be safe, what's your email in case we \
                                 can't reach you by phone?",
                            )
                        },
                        Err(_) => TurnOutcome::reply(
                            "I didn't catch that number. Could you share it again? (US \
                             numbers like 555-123-4567, or include +1 if you prefer)",
                        ),
                    },
                );
            }
            state.phone_preference_indicated = false;
            return Some(TurnOutcome::reply(
                "I didn't catch a valid phone number. Could you please share it again?",
            ));
        }

        None
    }
}

enum PhoneStep {
    Store(String),
    Reply(TurnOutcome),
    Skip,
}

enum EmailStep {
    Store(String),
    Reply(TurnOutcome),
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::validation::PermissiveChecker;

    struct ScriptedExtractor {
        outcome: ExtractionOutcome,
    }

    #[async_trait]
    impl FieldExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            _message: &str,
            _customer_type: Option<CustomerType>,
            _history: &[Turn],
            _current_coffee_style_known: bool,
        ) -> ExtractionOutcome {
            self.outcome.clone()
        }
    }

    fn pipeline_with(fields: Vec<(FieldId, String)>) -> ExtractionPipeline {
        ExtractionPipeline::new(
            Arc::new(ScriptedExtractor {
                outcome: ExtractionOutcome {
                    fields,
                    ..Default::default()
                },
            }),
            PhoneValidator::new("US"),
            Arc::new(EmailValidator::new(Arc::new(PermissiveChecker))),
        )
    }

    fn qualifying_state() -> ConversationState {
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.set_intent_stage(IntentStage::Qualifying);
        state
    }

    #[tokio::test]
    async fn test_populated_field_never_overwritten() {
        let pipeline = pipeline_with(vec![(FieldId::Name, "Alex".to_string())]);
        let mut state = qualifying_state();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));

        pipeline.process("I'm Alex", &[], &mut state, None).await;
        assert_eq!(state.given_value(FieldId::Name), Some("Sam"));
    }

    #[tokio::test]
    async fn test_ten_digit_phone_asks_confirmation_then_stores() {
        let pipeline = pipeline_with(vec![(FieldId::Phone, "5551234567".to_string())]);
        let mut state = qualifying_state();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));

        let outcome = pipeline
            .process("5551234567", &[], &mut state, None)
            .await
            .unwrap();
        assert!(outcome.response.contains("+1 555 123 4567"));
        assert_eq!(
            state.pending_phone_confirmation.as_deref(),
            Some("+15551234567")
        );
        assert!(!state.is_set(FieldId::Phone));

        // Confirming stores the number and asks for an email backup
        let outcome = pipeline.process("yes", &[], &mut state, None).await.unwrap();
        assert_eq!(state.given_value(FieldId::Phone), Some("+15551234567"));
        assert!(outcome.response.contains("email"));
    }

    #[tokio::test]
    async fn test_explicit_country_phone_stored_directly() {
        let pipeline = pipeline_with(vec![(FieldId::Phone, "+447911123456".to_string())]);
        let mut state = qualifying_state();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));

        // Name + phone completes minimum qualification immediately
        let outcome = pipeline
            .process("+44 7911 123456", &[], &mut state, None)
            .await
            .unwrap();
        assert_eq!(state.given_value(FieldId::Phone), Some("+447911123456"));
        assert_eq!(state.country_code, "GB");
        assert!(state.is_qualified);
        assert!(outcome.response.contains("Sam"));
    }

    #[tokio::test]
    async fn test_ambiguous_volume_asks_for_unit() {
        let pipeline = pipeline_with(vec![(FieldId::Volume, "200".to_string())]);
        let mut state = qualifying_state();

        let outcome = pipeline.process("200", &[], &mut state, None).await.unwrap();
        assert!(outcome.response.contains("200 what?"));
        assert!(!state.is_set(FieldId::Volume));
    }

    #[tokio::test]
    async fn test_email_typo_asks_for_confirmation() {
        let pipeline = pipeline_with(vec![(FieldId::Email, "sam@gmial.com".to_string())]);
        let mut state = qualifying_state();

        let outcome = pipeline
            .process("sam@gmial.com", &[], &mut state, None)
            .await
            .unwrap();
        assert!(outcome.response.contains("sam@gmail.com"));
        assert_eq!(state.email_typo_suggested.as_deref(), Some("sam@gmail.com"));
        assert!(!state.is_set(FieldId::Email));
    }

    #[tokio::test]
    async fn test_vague_pain_point_triggers_clarification() {
        let pipeline =
            pipeline_with(vec![(FieldId::CurrentPainPoints, "unclear".to_string())]);
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::ExistingCafe);
        state.set_intent_stage(IntentStage::Qualifying);

        let outcome = pipeline
            .process("some issues I guess", &[], &mut state, None)
            .await
            .unwrap();
        assert!(!state.is_set(FieldId::CurrentPainPoints));
        assert!(!outcome.response.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_stores_short_answer() {
        let pipeline = pipeline_with(vec![]);
        let mut state = qualifying_state();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        let history = vec![Turn::bot("When are you thinking of opening your café?")];

        pipeline
            .process("probably in the spring", &history, &mut state, None)
            .await;
        assert_eq!(
            state.given_value(FieldId::Timeline),
            Some("probably in the spring")
        );
    }

    #[tokio::test]
    async fn test_low_engagement_offers_shortcut() {
        let pipeline = pipeline_with(vec![]);
        let mut state = qualifying_state();
        state.brief_response_count = 3;

        let outcome = pipeline.process("ok", &[], &mut state, None).await.unwrap();
        assert!(outcome.response.contains("contact info"));
    }

    #[tokio::test]
    async fn test_rag_counter_reset_on_answer() {
        let pipeline = pipeline_with(vec![(FieldId::Timeline, "in_3_months".to_string())]);
        let mut state = qualifying_state();
        state.rag_questions_count = 2;

        pipeline
            .process("opening in 3 months", &[], &mut state, None)
            .await;
        assert_eq!(state.rag_questions_count, 0);
    }

    #[tokio::test]
    async fn test_intent_confirmed_moves_to_qualifying() {
        let pipeline = pipeline_with(vec![]);
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.set_intent_stage(IntentStage::IntentConfirmed);

        pipeline.process("sounds good", &[], &mut state, None).await;
        assert_eq!(state.intent_stage, IntentStage::Qualifying);
    }
}
