//! Contact-collection sub-flow
//!
//! One state machine collects a contact method for every caller that needs
//! it: the talk-to-a-person flow and the order flow share the same stages,
//! refusal pivots, and phone-confirmation loop, with per-caller wording
//! supplied by `Script`. Qualification's inline contact collection reuses the
//! same validators and confirmation copy via the extraction pipeline.

use std::sync::Arc;

use cafe_agent_core::{CustomerType, IntentStage, Turn, TurnOutcome};

use crate::extraction::heuristics::{detect_refusal, extract_email_from_text};
use crate::extraction::FieldExtractor;
use crate::state::{ContactPurpose, ContactStage, ConversationState, FieldId, FieldValue};
use crate::validation::{
    extract_phone_from_text, format_phone_for_display, EmailValidation, EmailValidator,
    PhoneValidator,
};

const CONFIRM_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "correct", "right", "sure", "ok", "okay", "perfect",
];
const DENY_WORDS: &[&str] = &["no", "nope", "wrong", "incorrect", "not"];

fn is_confirmation(message: &str) -> bool {
    let lower = message.to_lowercase();
    CONFIRM_WORDS.iter().any(|w| lower.contains(w))
}

fn is_denial(message: &str) -> bool {
    let lower = message.to_lowercase();
    DENY_WORDS.iter().any(|w| lower.contains(w))
}

/// Per-caller wording for the shared flow
struct Script;

impl Script {
    fn ask_method(purpose: ContactPurpose) -> &'static str {
        match purpose {
            ContactPurpose::HumanConnection => {
                "I'd be happy to connect you with our team! What's the best way to reach \
                 you—phone or email?"
            },
            ContactPurpose::Order => {
                "I'd love to help with that! Our team handles orders directly. What's the \
                 best way to reach you—phone or email?"
            },
        }
    }

    fn completed(purpose: ContactPurpose, contact_display: &str) -> String {
        match purpose {
            ContactPurpose::HumanConnection => format!(
                "Great! Our team will reach out to you at {}. We'll be in touch soon!",
                contact_display
            ),
            ContactPurpose::Order => format!(
                "Awesome! I've noted your request. Our team will reach out to you at {} to \
                 process your order. They'll get back to you shortly!",
                contact_display
            ),
        }
    }

    fn completed_both(purpose: ContactPurpose, first: &str, second: &str) -> String {
        match purpose {
            ContactPurpose::HumanConnection => format!(
                "Awesome! Our team will reach out to you at {} or {}. We'll be in touch soon!",
                first, second
            ),
            ContactPurpose::Order => format!(
                "Perfect! I've noted your request. Our team will reach out at {} or {} to \
                 process your order. They'll be in touch shortly!",
                first, second
            ),
        }
    }
}

/// Shared contact-collection state machine
pub struct ContactFlow {
    phone_validator: PhoneValidator,
    email_validator: Arc<EmailValidator>,
    extractor: Arc<dyn FieldExtractor>,
}

impl ContactFlow {
    pub fn new(
        phone_validator: PhoneValidator,
        email_validator: Arc<EmailValidator>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        Self {
            phone_validator,
            email_validator,
            extractor,
        }
    }

    fn mark_qualified_if_named(state: &mut ConversationState) {
        if !state.is_qualified && state.is_set(FieldId::Name) {
            state.is_qualified = true;
            state.set_intent_stage(IntentStage::Qualified);
        }
    }

    /// Enter the flow for a caller that needs contact info collected
    ///
    /// When contact info already exists the flow confirms it instead of
    /// re-collecting.
    pub fn enter(&self, state: &mut ConversationState, purpose: ContactPurpose) -> TurnOutcome {
        state.contact_purpose = Some(purpose);

        let existing = state
            .given_value(FieldId::Phone)
            .map(format_phone_for_display)
            .or_else(|| state.given_value(FieldId::Email).map(str::to_string));

        if let Some(contact) = existing {
            Self::mark_qualified_if_named(state);
            state.human_connection_confirmed = true;
            state.contact_stage = Some(ContactStage::Confirmed);
            return match purpose {
                ContactPurpose::HumanConnection => TurnOutcome::reply(format!(
                    "Great! Our team will reach out to you at {}. Is that still the best \
                     way to reach you?",
                    contact
                )),
                ContactPurpose::Order => TurnOutcome::reply(Script::completed(purpose, &contact)),
            };
        }

        state.contact_stage = Some(ContactStage::AwaitingMethod);
        TurnOutcome::reply(Script::ask_method(purpose))
    }

    /// Advance the active flow with the user's message
    ///
    /// Returns `None` when no stage is active.
    pub async fn advance(
        &self,
        message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> Option<TurnOutcome> {
        let stage = state.contact_stage?;
        let purpose = state.contact_purpose.unwrap_or(ContactPurpose::HumanConnection);

        let outcome = match stage {
            ContactStage::AwaitingMethod => self.on_method_choice(message, state, purpose),
            ContactStage::AwaitingPhone => self.on_phone(message, history, state).await,
            ContactStage::AwaitingPhoneConfirmation => {
                self.on_phone_confirmation(message, state)
            },
            ContactStage::AwaitingEmail => {
                self.on_email(message, history, state, purpose, false).await
            },
            ContactStage::AwaitingEmailBackup => {
                self.on_email(message, history, state, purpose, true).await
            },
            ContactStage::Confirmed => return self.on_confirmed(message, state),
        };
        Some(outcome)
    }

    fn on_method_choice(
        &self,
        message: &str,
        state: &mut ConversationState,
        _purpose: ContactPurpose,
    ) -> TurnOutcome {
        let lower = message.to_lowercase();
        tracing::info!(message, "Processing contact method choice");

        // Refusing email at method selection pivots straight to phone
        if (lower.contains("email") || lower.contains("mail")) && detect_refusal(message) {
            state.track_contact_refusal(FieldId::Email);
            state.contact_stage = Some(ContactStage::AwaitingPhone);
            state.email_preference_indicated = false;
            return TurnOutcome::reply("Got it! What's your phone number?");
        }

        if ["both", "either", "any", "all"].iter().any(|w| lower.contains(w)) {
            state.contact_stage = Some(ContactStage::AwaitingPhone);
            state.phone_preference_indicated = true;
            state.email_preference_indicated = true;
            return TurnOutcome::reply("Perfect! Let's start with your phone number.");
        }

        if ["phone", "call", "number", "mobile", "cell"].iter().any(|w| lower.contains(w)) {
            state.contact_stage = Some(ContactStage::AwaitingPhone);
            state.phone_preference_indicated = true;
            return TurnOutcome::reply("Got it! What's your phone number?");
        }

        if ["email", "mail", "e-mail"].iter().any(|w| lower.contains(w)) {
            state.contact_stage = Some(ContactStage::AwaitingEmail);
            state.email_preference_indicated = true;
            return TurnOutcome::reply("Perfect! What's your email address?");
        }

        TurnOutcome::reply(
            "I'd like to make sure I connect you with the right person. Would you prefer \
             to be contacted by phone or email?",
        )
    }

    async fn on_phone(
        &self,
        message: &str,
        history: &[Turn],
        state: &mut ConversationState,
    ) -> TurnOutcome {
        tracing::info!(message, "Processing phone number");

        let candidate = match extract_phone_from_text(message) {
            Some(candidate) => Some(candidate),
            None => {
                let customer_type = state.customer_type.or(Some(CustomerType::NewCafe));
                self.extractor
                    .extract(message, customer_type, history, true)
                    .await
                    .get(FieldId::Phone)
                    .map(str::to_string)
            },
        };

        let raw = match candidate {
            Some(raw) => raw,
            None => {
                return TurnOutcome::reply(
                    "I didn't catch that number. Could you share it again? (US numbers like \
                     555-123-4567, or include +1 if you prefer)",
                )
            },
        };

        match self
            .phone_validator
            .validate_and_format(&raw, Some(state.country_code.as_str()), Some(message))
        {
            Ok(validated) => {
                state.country_code = validated.country.clone();
                let display = format_phone_for_display(&validated.e164);
                state.set_field(FieldId::Phone, FieldValue::Given(validated.e164));
                state.contact_stage = Some(ContactStage::AwaitingPhoneConfirmation);
                TurnOutcome::reply(format!(
                    "Is {} the best number to reach you? If not, please provide your number \
                     with country code.",
                    display
                ))
            },
            Err(e) => TurnOutcome::reply(format!(
                "{} Please share your phone number again (e.g., 555-123-4567 or \
                 +1 555-123-4567).",
                e.user_message()
            )),
        }
    }

    fn on_phone_confirmation(
        &self,
        message: &str,
        state: &mut ConversationState,
    ) -> TurnOutcome {
        tracing::info!(message, "User confirming phone");

        if is_denial(message) {
            state.clear_field(FieldId::Phone);
            state.contact_stage = Some(ContactStage::AwaitingPhone);
            return TurnOutcome::reply("No problem! What's the correct phone number?");
        }

        if is_confirmation(message) {
            if state.email_preference_indicated && !state.is_set(FieldId::Email) {
                // The user asked for both earlier; email is primary, not backup
                state.contact_stage = Some(ContactStage::AwaitingEmail);
                return TurnOutcome::reply("Great! Now, what's your email address?");
            }
            state.contact_stage = Some(ContactStage::AwaitingEmailBackup);
            return TurnOutcome::reply(
                "Perfect! Just to be safe, what's your email in case we can't reach you \
                 by phone?",
            );
        }

        let display = state
            .given_value(FieldId::Phone)
            .map(format_phone_for_display)
            .unwrap_or_else(|| "that number".to_string());
        TurnOutcome::reply(format!(
            "Just to confirm, is {} the best number to reach you? (Yes or No)",
            display
        ))
    }

    async fn on_email(
        &self,
        message: &str,
        history: &[Turn],
        state: &mut ConversationState,
        purpose: ContactPurpose,
        is_backup: bool,
    ) -> TurnOutcome {
        tracing::info!(message, is_backup, "Processing email address");

        if detect_refusal(message) {
            state.track_contact_refusal(FieldId::Email);
            state.set_field(FieldId::Email, FieldValue::Declined);

            if is_backup {
                // Phone-only is fine; finish the flow gracefully
                state.human_connection_confirmed = true;
                state.contact_stage = Some(ContactStage::Confirmed);
                Self::mark_qualified_if_named(state);
                let display = state
                    .given_value(FieldId::Phone)
                    .map(format_phone_for_display)
                    .unwrap_or_else(|| "your phone".to_string());
                return TurnOutcome::reply(format!(
                    "No problem! We'll use {} to connect. Is there anything else you'd \
                     like to know?",
                    display
                ));
            }
            state.contact_stage = Some(ContactStage::AwaitingPhone);
            return TurnOutcome::reply(
                "No problem! Would you prefer to share your phone number instead?",
            );
        }

        let candidate = match extract_email_from_text(message) {
            Some(candidate) => Some(candidate),
            None => {
                let customer_type = state.customer_type.or(Some(CustomerType::NewCafe));
                self.extractor
                    .extract(message, customer_type, history, true)
                    .await
                    .get(FieldId::Email)
                    .map(str::to_string)
            },
        };

        let raw = match candidate {
            Some(raw) => raw,
            None => {
                return TurnOutcome::reply(
                    "I didn't catch that email address. Could you share it again? \
                     (e.g., name@example.com)",
                )
            },
        };

        match self.email_validator.validate(&raw) {
            EmailValidation::Valid { normalized } => {
                state.set_field(FieldId::Email, FieldValue::Given(normalized.clone()));
                state.human_connection_confirmed = true;
                state.contact_stage = Some(ContactStage::Confirmed);
                Self::mark_qualified_if_named(state);

                let phone_display = state.given_value(FieldId::Phone).map(format_phone_for_display);
                match phone_display {
                    Some(phone) if is_backup || state.phone_preference_indicated => {
                        TurnOutcome::reply(Script::completed_both(purpose, &phone, &normalized))
                    },
                    _ => TurnOutcome::reply(Script::completed(purpose, &normalized)),
                }
            },
            EmailValidation::TypoSuspected { suggestion } => {
                state.set_email_typo_suggested(&suggestion);
                TurnOutcome::reply(format!("I think you meant {}—is that right?", suggestion))
            },
            EmailValidation::Invalid { reason } => TurnOutcome::reply(format!(
                "{} Please share a valid email address.",
                reason
            )),
        }
    }

    fn on_confirmed(&self, message: &str, state: &ConversationState) -> Option<TurnOutcome> {
        if state.human_connection_confirmed && is_confirmation(message) {
            return Some(TurnOutcome::reply(
                "Perfect! Our team will be in touch soon. Looking forward to connecting \
                 with you!",
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::extraction::ExtractionOutcome;
    use crate::validation::PermissiveChecker;

    struct EmptyExtractor;

    #[async_trait]
    impl FieldExtractor for EmptyExtractor {
        async fn extract(
            &self,
            _message: &str,
            _customer_type: Option<CustomerType>,
            _history: &[Turn],
            _current_coffee_style_known: bool,
        ) -> ExtractionOutcome {
            ExtractionOutcome::default()
        }
    }

    fn flow() -> ContactFlow {
        ContactFlow::new(
            PhoneValidator::new("US"),
            Arc::new(EmailValidator::new(Arc::new(PermissiveChecker))),
            Arc::new(EmptyExtractor),
        )
    }

    #[test]
    fn test_enter_without_contact_asks_method() {
        let mut state = ConversationState::new();
        let outcome = flow().enter(&mut state, ContactPurpose::HumanConnection);
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingMethod));
        assert!(outcome.response.contains("phone or email"));
    }

    #[test]
    fn test_enter_with_existing_contact_confirms() {
        let mut state = ConversationState::new();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        state.set_field(FieldId::Phone, FieldValue::Given("+15551234567".into()));

        let outcome = flow().enter(&mut state, ContactPurpose::HumanConnection);
        assert_eq!(state.contact_stage, Some(ContactStage::Confirmed));
        assert!(state.is_qualified);
        assert!(outcome.response.contains("+1 555 123 4567"));
    }

    #[tokio::test]
    async fn test_full_phone_path_with_email_backup() {
        let flow = flow();
        let mut state = ConversationState::new();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        flow.enter(&mut state, ContactPurpose::HumanConnection);

        let outcome = flow.advance("phone please", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingPhone));
        assert!(outcome.response.contains("phone number"));

        let outcome = flow.advance("555-123-4567", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingPhoneConfirmation));
        assert!(outcome.response.contains("+1 555 123 4567"));

        let _ = flow.advance("yes that's right", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingEmailBackup));

        let outcome = flow.advance("sam@gmail.com", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::Confirmed));
        assert!(state.is_qualified);
        assert!(outcome.response.contains("sam@gmail.com"));
    }

    #[tokio::test]
    async fn test_email_backup_refusal_pivots_to_phone_only() {
        let flow = flow();
        let mut state = ConversationState::new();
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        state.set_field(FieldId::Phone, FieldValue::Given("+15551234567".into()));
        state.contact_stage = Some(ContactStage::AwaitingEmailBackup);
        state.contact_purpose = Some(ContactPurpose::HumanConnection);

        let outcome = flow
            .advance("no, I don't want to share that", &[], &mut state)
            .await
            .unwrap();
        assert_eq!(state.get_field(FieldId::Email), Some(&FieldValue::Declined));
        assert_eq!(state.contact_stage, Some(ContactStage::Confirmed));
        assert!(state.human_connection_confirmed);
        assert!(outcome.response.contains("+1 555 123 4567"));
    }

    #[tokio::test]
    async fn test_phone_denial_reasks() {
        let flow = flow();
        let mut state = ConversationState::new();
        state.set_field(FieldId::Phone, FieldValue::Given("+15551234567".into()));
        state.contact_stage = Some(ContactStage::AwaitingPhoneConfirmation);
        state.contact_purpose = Some(ContactPurpose::HumanConnection);

        let outcome = flow.advance("no that's wrong", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingPhone));
        assert!(state.get_field(FieldId::Phone).is_none());
        assert!(outcome.response.contains("correct phone number"));
    }

    #[tokio::test]
    async fn test_both_preference_collects_email_as_primary() {
        let flow = flow();
        let mut state = ConversationState::new();
        flow.enter(&mut state, ContactPurpose::Order);

        let _ = flow.advance("both would be great", &[], &mut state).await.unwrap();
        assert!(state.phone_preference_indicated && state.email_preference_indicated);

        let _ = flow.advance("555-123-4567", &[], &mut state).await.unwrap();
        let outcome = flow.advance("yes", &[], &mut state).await.unwrap();
        assert_eq!(state.contact_stage, Some(ContactStage::AwaitingEmail));
        assert!(outcome.response.contains("email address"));
    }

    #[tokio::test]
    async fn test_email_typo_suggestion_in_flow() {
        let flow = flow();
        let mut state = ConversationState::new();
        state.contact_stage = Some(ContactStage::AwaitingEmail);
        state.contact_purpose = Some(ContactPurpose::HumanConnection);

        let outcome = flow.advance("it's sam@gmial.com", &[], &mut state).await.unwrap();
        assert!(outcome.response.contains("sam@gmail.com"));
        assert_eq!(state.email_typo_suggested.as_deref(), Some("sam@gmail.com"));
        assert!(!state.is_set(FieldId::Email));
    }
}
