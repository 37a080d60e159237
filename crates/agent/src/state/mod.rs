//! Conversation state for the outbound lead-qualification agent
//!
//! One owned value per conversation. The caller round-trips it through its
//! store as a JSON mapping each turn; `from_value`/`write_to` preserve keys
//! the caller keeps alongside ours.

mod fields;
mod tracking;

pub use fields::{FieldId, FieldValue, TO_BE_DISCUSSED, USER_DECLINED};
pub use tracking::EngagementLevel;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cafe_agent_core::{CustomerType, Error, IntentStage, Result};
use cafe_agent_config::constants::flow;

/// Stage of the nested contact-collection sub-flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStage {
    /// Asking whether the user prefers phone or email
    AwaitingMethod,
    /// Collecting a phone number
    AwaitingPhone,
    /// Confirming a formatted phone number
    AwaitingPhoneConfirmation,
    /// Collecting an email address (chosen as primary)
    AwaitingEmail,
    /// Collecting an email backup after phone confirmation
    AwaitingEmailBackup,
    /// Contact collected and hand-off confirmed
    Confirmed,
}

/// Which caller owns the active contact sub-flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPurpose {
    /// User asked to talk to a real person
    HumanConnection,
    /// User wants to place an order or request samples
    Order,
}

/// A topic the conversation already covered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussedTopic {
    pub value: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub was_uncertain: bool,
}

fn default_country() -> String {
    "US".to_string()
}

fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

/// Structured conversation state for the outbound agent
///
/// Mutated in place every turn by the flow controller; never destroyed while
/// the conversation record lives in the caller's store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    // Core state
    pub customer_type: Option<CustomerType>,
    pub intent_stage: IntentStage,
    pub is_qualified: bool,
    pub rag_questions_count: u32,
    pub pending_phone: Option<String>,
    pub pending_phone_confirmation: Option<String>,
    #[serde(default = "default_country")]
    pub country_code: String,
    pub current_field_being_asked: Option<FieldId>,
    pub current_field_ask_count: u32,
    pub skipped_preferred_count: u32,

    // Validation tracking
    pub phone_validation_attempts: u32,
    pub phone_needs_manual_review: bool,
    pub email_validation_attempts: u32,
    pub email_typo_suggested: Option<String>,

    // Contact preference indication (word like "email" given instead of a value)
    pub email_preference_indicated: bool,
    pub phone_preference_indicated: bool,

    // Contact refusals
    pub contact_refusal_count: u32,
    pub last_refused_field: Option<FieldId>,
    pub refusal_timestamps: Vec<DateTime<Utc>>,

    // Contact-collection sub-flow
    pub human_connection_confirmed: bool,
    #[serde(rename = "human_connection_flow_stage")]
    pub contact_stage: Option<ContactStage>,
    pub contact_purpose: Option<ContactPurpose>,

    // Last offer the agent made, for repetition avoidance
    pub last_bot_offer: Option<String>,

    // Conversation memory
    pub discussed_topics: HashMap<String, DiscussedTopic>,
    pub user_uncertainties: Vec<String>,

    // Engagement tracking
    pub user_engagement_level: EngagementLevel,
    pub brief_response_count: u32,

    // Recently used phrases (repetition check)
    pub recent_phrases: Vec<String>,

    // New café fields
    timeline: Option<FieldValue>,
    coffee_style: Option<FieldValue>,
    equipment: Option<FieldValue>,
    volume: Option<FieldValue>,

    // Existing café fields
    current_pain_points: Option<FieldValue>,
    cafe_count: Option<FieldValue>,
    support_needs: Option<FieldValue>,
    current_coffee_style: Option<FieldValue>,
    coffee_preference: Option<FieldValue>,

    // Contact fields (required for both types)
    name: Option<FieldValue>,
    phone: Option<FieldValue>,
    email: Option<FieldValue>,

    // Order request
    pub wants_to_place_order: bool,
    pub order_details: Option<String>,

    // Metadata
    pub rag_question_topics: Vec<String>,
    #[serde(default = "default_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            customer_type: None,
            intent_stage: IntentStage::Exploring,
            is_qualified: false,
            rag_questions_count: 0,
            pending_phone: None,
            pending_phone_confirmation: None,
            country_code: default_country(),
            current_field_being_asked: None,
            current_field_ask_count: 0,
            skipped_preferred_count: 0,
            phone_validation_attempts: 0,
            phone_needs_manual_review: false,
            email_validation_attempts: 0,
            email_typo_suggested: None,
            email_preference_indicated: false,
            phone_preference_indicated: false,
            contact_refusal_count: 0,
            last_refused_field: None,
            refusal_timestamps: Vec::new(),
            human_connection_confirmed: false,
            contact_stage: None,
            contact_purpose: None,
            last_bot_offer: None,
            discussed_topics: HashMap::new(),
            user_uncertainties: Vec::new(),
            user_engagement_level: EngagementLevel::High,
            brief_response_count: 0,
            recent_phrases: Vec::new(),
            timeline: None,
            coffee_style: None,
            equipment: None,
            volume: None,
            current_pain_points: None,
            cafe_count: None,
            support_needs: None,
            current_coffee_style: None,
            coffee_preference: None,
            name: None,
            phone: None,
            email: None,
            wants_to_place_order: false,
            order_details: None,
            rag_question_topics: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    // ====== Serialization ======

    /// Rebuild state from the caller's stored mapping
    ///
    /// Missing keys take defaults; unknown keys are ignored, so the caller
    /// may keep extra data in the same mapping.
    pub fn from_value(data: &serde_json::Value) -> Result<Self> {
        if data.is_null() {
            return Ok(Self::new());
        }
        serde_json::from_value(data.clone())
            .map_err(|e| Error::State(format!("Malformed conversation state: {}", e)))
    }

    /// Merge this state into the caller's mapping, preserving foreign keys
    pub fn write_to(&self, data: &mut serde_json::Value) -> Result<()> {
        let ours = serde_json::to_value(self)
            .map_err(|e| Error::State(format!("Failed to serialize state: {}", e)))?;

        if !data.is_object() {
            *data = serde_json::Value::Object(serde_json::Map::new());
        }
        let map = data
            .as_object_mut()
            .ok_or_else(|| Error::State("Conversation data is not a mapping".to_string()))?;
        if let serde_json::Value::Object(ours) = ours {
            for (k, v) in ours {
                map.insert(k, v);
            }
        }
        Ok(())
    }

    // ====== Field access ======

    fn slot(&self, field: FieldId) -> &Option<FieldValue> {
        match field {
            FieldId::Name => &self.name,
            FieldId::Phone => &self.phone,
            FieldId::Email => &self.email,
            FieldId::Timeline => &self.timeline,
            FieldId::CoffeeStyle => &self.coffee_style,
            FieldId::Equipment => &self.equipment,
            FieldId::Volume => &self.volume,
            FieldId::CurrentPainPoints => &self.current_pain_points,
            FieldId::CafeCount => &self.cafe_count,
            FieldId::SupportNeeds => &self.support_needs,
            FieldId::CurrentCoffeeStyle => &self.current_coffee_style,
            FieldId::CoffeePreference => &self.coffee_preference,
        }
    }

    fn slot_mut(&mut self, field: FieldId) -> &mut Option<FieldValue> {
        match field {
            FieldId::Name => &mut self.name,
            FieldId::Phone => &mut self.phone,
            FieldId::Email => &mut self.email,
            FieldId::Timeline => &mut self.timeline,
            FieldId::CoffeeStyle => &mut self.coffee_style,
            FieldId::Equipment => &mut self.equipment,
            FieldId::Volume => &mut self.volume,
            FieldId::CurrentPainPoints => &mut self.current_pain_points,
            FieldId::CafeCount => &mut self.cafe_count,
            FieldId::SupportNeeds => &mut self.support_needs,
            FieldId::CurrentCoffeeStyle => &mut self.current_coffee_style,
            FieldId::CoffeePreference => &mut self.coffee_preference,
        }
    }

    /// Get a field value
    pub fn get_field(&self, field: FieldId) -> Option<&FieldValue> {
        self.slot(field).as_ref()
    }

    /// Whether the field holds anything (a real answer or a sentinel)
    pub fn is_set(&self, field: FieldId) -> bool {
        self.slot(field).is_some()
    }

    /// The field's real answer, if one was given
    pub fn given_value(&self, field: FieldId) -> Option<&str> {
        match self.slot(field) {
            Some(FieldValue::Given(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Set a field value, resetting its ask tracking
    ///
    /// Callers must check `get_field` first; populated fields are only
    /// overwritten through explicit declined/to-be-discussed transitions.
    pub fn set_field(&mut self, field: FieldId, value: FieldValue) {
        tracing::debug!(field = %field, value = value.as_str(), "Stored field");
        *self.slot_mut(field) = Some(value);
        if self.current_field_being_asked == Some(field) {
            self.reset_field_tracking();
        }
    }

    /// Clear a field (used when completion validation rejects a value)
    pub fn clear_field(&mut self, field: FieldId) {
        *self.slot_mut(field) = None;
    }

    // ====== Field sets ======

    /// Required fields shown in context for this customer type
    pub fn required_fields(&self, customer_type: CustomerType) -> &'static [FieldId] {
        FieldId::required_fields(customer_type)
    }

    /// Preferred fields for this customer type
    pub fn preferred_fields(&self, customer_type: CustomerType) -> &'static [FieldId] {
        FieldId::preferred_fields(customer_type)
    }

    /// Required fields already collected
    pub fn collected_fields(&self, customer_type: CustomerType) -> Vec<FieldId> {
        FieldId::required_fields(customer_type)
            .iter()
            .copied()
            .filter(|f| self.is_set(*f))
            .collect()
    }

    /// Fields still needed, in ask order: name, preferred, phone, email
    ///
    /// Once the user has skipped enough preferred fields, the remaining ones
    /// are bulk-marked `to_be_discussed_with_team` and drop out of the list.
    pub fn missing_fields(&mut self, customer_type: CustomerType) -> Vec<FieldId> {
        let mut missing = Vec::new();
        if !self.is_set(FieldId::Name) {
            missing.push(FieldId::Name);
        }

        if self.skipped_preferred_count >= flow::MAX_PREFERRED_SKIPS {
            let remaining: Vec<FieldId> = FieldId::preferred_fields(customer_type)
                .iter()
                .copied()
                .filter(|f| !self.is_set(*f))
                .collect();
            if !remaining.is_empty() {
                tracing::info!(
                    skipped = self.skipped_preferred_count,
                    "User skipped enough preferred fields - skipping the rest"
                );
            }
            for field in remaining {
                self.set_field(field, FieldValue::ToBeDiscussed);
            }
        } else {
            for field in FieldId::preferred_fields(customer_type) {
                if !self.is_set(*field) {
                    missing.push(*field);
                }
            }
        }

        if !self.is_set(FieldId::Phone) {
            missing.push(FieldId::Phone);
        }
        if !self.is_set(FieldId::Email) {
            missing.push(FieldId::Email);
        }
        missing
    }

    /// Minimum qualification: name plus at least one contact channel.
    ///
    /// Sentinels count as collected here; a declined phone with a real email
    /// (or vice versa) still qualifies.
    pub fn is_complete(&self, _customer_type: CustomerType) -> bool {
        self.is_set(FieldId::Name) && (self.is_set(FieldId::Phone) || self.is_set(FieldId::Email))
    }

    /// Whether a field may be auto-skipped (preferred fields only)
    pub fn is_skippable_field(&self, field: FieldId) -> bool {
        match self.customer_type {
            Some(ct) => FieldId::preferred_fields(ct).contains(&field),
            None => false,
        }
    }

    /// A real, validated phone (not a sentinel, normalized with country code)
    pub fn has_actual_phone(&self) -> bool {
        matches!(self.given_value(FieldId::Phone), Some(p) if p.starts_with('+'))
    }

    /// A real email address (not a sentinel)
    pub fn has_actual_email(&self) -> bool {
        matches!(self.given_value(FieldId::Email), Some(e) if e.contains('@'))
    }

    /// Format a stored value for display (underscores to spaces, title case)
    pub fn format_for_display(value: &str) -> String {
        value
            .replace('_', " ")
            .split_whitespace()
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
