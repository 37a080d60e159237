//! End-of-qualification business rules
//!
//! Pure field-set validation, separate from conversation flow. A declined
//! contact channel is acceptable as long as the other one is real.

use std::sync::Arc;

use cafe_agent_core::CustomerType;

use crate::state::{ConversationState, FieldId, FieldValue, TO_BE_DISCUSSED, USER_DECLINED};
use crate::validation::{EmailValidation, EmailValidator, PhoneValidator};

/// Fully qualified lead data handed to the caller's CRM layer
#[derive(Debug, Clone)]
pub struct QualifiedLead {
    pub customer_type: CustomerType,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub phone_needs_review: bool,
    /// All per-type fields, sentinels included
    pub fields: Vec<(FieldId, String)>,
}

/// Result of the qualification check
#[derive(Debug, Clone)]
pub enum QualificationOutcome {
    Qualified(QualifiedLead),
    /// Fields still missing; not an error, keep collecting
    Incomplete { missing: Vec<FieldId> },
    /// A collected value failed validation and must be re-asked
    ValidationFailed { field: FieldId, message: String },
}

/// Friendly re-prompt copy for a failed field
pub fn friendly_validation_message(field: FieldId) -> String {
    match field {
        FieldId::Phone => {
            "Hmm, that number doesn't look quite right. Could you share it again? \
             (e.g., 555-123-4567 or +1 555-123-4567)"
                .to_string()
        },
        FieldId::Email => {
            "That email doesn't look quite right. Could you double-check it? \
             (e.g., name@example.com)"
                .to_string()
        },
        FieldId::Name => "Could you share your full name?".to_string(),
        other => format!("Could you tell me a bit more about your {}?", other.as_str().replace('_', " ")),
    }
}

/// Validates completed qualification field sets
pub struct Qualifier {
    phone_validator: PhoneValidator,
    email_validator: Arc<EmailValidator>,
}

impl Qualifier {
    pub fn new(phone_validator: PhoneValidator, email_validator: Arc<EmailValidator>) -> Self {
        Self {
            phone_validator,
            email_validator,
        }
    }

    /// Evaluate whether the collected state qualifies the customer
    pub fn evaluate(&self, state: &ConversationState) -> QualificationOutcome {
        let customer_type = match state.customer_type {
            Some(ct) => ct,
            None => {
                return QualificationOutcome::Incomplete {
                    missing: vec![FieldId::Name],
                }
            },
        };

        let mut missing = Vec::new();
        let mut fields = Vec::new();

        for field in FieldId::preferred_fields(customer_type) {
            match state.get_field(*field) {
                Some(value) => fields.push((*field, value.as_str().to_string())),
                None => missing.push(*field),
            }
        }

        let name = match state.get_field(FieldId::Name) {
            Some(FieldValue::Given(name)) if name.trim().len() >= 2 => name.trim().to_string(),
            Some(FieldValue::Given(_)) => {
                return QualificationOutcome::ValidationFailed {
                    field: FieldId::Name,
                    message: friendly_validation_message(FieldId::Name),
                }
            },
            _ => {
                missing.push(FieldId::Name);
                String::new()
            },
        };

        // Phone: declined is acceptable, unvalidated raw numbers get one more check
        let phone = match state.get_field(FieldId::Phone) {
            None => {
                missing.push(FieldId::Phone);
                None
            },
            Some(FieldValue::Declined) => Some(USER_DECLINED.to_string()),
            Some(FieldValue::ToBeDiscussed) => Some(TO_BE_DISCUSSED.to_string()),
            Some(FieldValue::Given(raw)) => {
                if raw.starts_with('+') || state.phone_needs_manual_review {
                    Some(raw.clone())
                } else {
                    match self.phone_validator.validate_and_format(raw, Some(state.country_code.as_str()), None) {
                        Ok(validated) => Some(validated.e164),
                        Err(_) => {
                            return QualificationOutcome::ValidationFailed {
                                field: FieldId::Phone,
                                message: friendly_validation_message(FieldId::Phone),
                            }
                        },
                    }
                }
            },
        };

        // Email: optional, but a given value must be valid
        let email = match state.get_field(FieldId::Email) {
            None => None,
            Some(FieldValue::Declined) => Some(USER_DECLINED.to_string()),
            Some(FieldValue::ToBeDiscussed) => None,
            Some(FieldValue::Given(raw)) => match self.email_validator.validate(raw) {
                EmailValidation::Valid { normalized } => Some(normalized),
                _ => {
                    return QualificationOutcome::ValidationFailed {
                        field: FieldId::Email,
                        message: friendly_validation_message(FieldId::Email),
                    }
                },
            },
        };

        let has_contact = phone.is_some() || email.as_deref().is_some_and(|e| e.contains('@'));
        if !missing.is_empty() || name.is_empty() || !has_contact {
            if phone.is_none() && email.is_none() {
                if !missing.contains(&FieldId::Phone) {
                    missing.push(FieldId::Phone);
                }
                missing.push(FieldId::Email);
            }
            return QualificationOutcome::Incomplete { missing };
        }

        QualificationOutcome::Qualified(QualifiedLead {
            customer_type,
            name,
            phone,
            email,
            phone_needs_review: state.phone_needs_manual_review,
            fields,
        })
    }
}

/// Human phrasing for stored timeline values in the completion message
pub fn timeline_phrase(timeline: Option<&str>) -> String {
    match timeline {
        Some("within_4_weeks") => "within 4 weeks".to_string(),
        Some("1_3_months") => "in 1-3 months".to_string(),
        Some("3_6_months") => "in 3-6 months".to_string(),
        Some("6_12_months") => "in 6-12 months".to_string(),
        Some("over_1_year") => "in over a year".to_string(),
        Some("in_6_months") | Some("six_months") => "in 6 months".to_string(),
        Some("unclear") | None => "soon".to_string(),
        Some(other) => other.replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::PermissiveChecker;

    fn qualifier() -> Qualifier {
        Qualifier::new(
            PhoneValidator::new("US"),
            Arc::new(EmailValidator::new(Arc::new(PermissiveChecker))),
        )
    }

    fn base_state() -> ConversationState {
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.set_field(FieldId::Timeline, FieldValue::Given("in_3_months".into()));
        state.set_field(FieldId::CoffeeStyle, FieldValue::Given("bold".into()));
        state.set_field(FieldId::Equipment, FieldValue::Given("no_equipment".into()));
        state.set_field(FieldId::Volume, FieldValue::Given("200_cups_daily".into()));
        state.set_field(FieldId::Name, FieldValue::Given("Sam".into()));
        state
    }

    #[test]
    fn test_qualifies_with_valid_phone() {
        let mut state = base_state();
        state.set_field(FieldId::Phone, FieldValue::Given("+15551234567".into()));

        match qualifier().evaluate(&state) {
            QualificationOutcome::Qualified(lead) => {
                assert_eq!(lead.name, "Sam");
                assert_eq!(lead.phone.as_deref(), Some("+15551234567"));
            },
            other => panic!("expected qualified, got {:?}", other),
        }
    }

    #[test]
    fn test_declined_phone_with_email_qualifies() {
        let mut state = base_state();
        state.set_field(FieldId::Phone, FieldValue::Declined);
        state.set_field(FieldId::Email, FieldValue::Given("sam@gmail.com".into()));

        match qualifier().evaluate(&state) {
            QualificationOutcome::Qualified(lead) => {
                assert_eq!(lead.phone.as_deref(), Some("user_declined"));
                assert_eq!(lead.email.as_deref(), Some("sam@gmail.com"));
            },
            other => panic!("expected qualified, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_stored_phone_fails_validation() {
        let mut state = base_state();
        state.set_field(FieldId::Phone, FieldValue::Given("12345".into()));

        match qualifier().evaluate(&state) {
            QualificationOutcome::ValidationFailed { field, .. } => {
                assert_eq!(field, FieldId::Phone);
            },
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_reported() {
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);

        match qualifier().evaluate(&state) {
            QualificationOutcome::Incomplete { missing } => {
                assert!(missing.contains(&FieldId::Timeline));
                assert!(missing.contains(&FieldId::Name));
            },
            other => panic!("expected incomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_timeline_phrases() {
        assert_eq!(timeline_phrase(Some("1_3_months")), "in 1-3 months");
        assert_eq!(timeline_phrase(Some("unclear")), "soon");
        assert_eq!(timeline_phrase(None), "soon");
        assert_eq!(timeline_phrase(Some("early_2026")), "early 2026");
    }
}
