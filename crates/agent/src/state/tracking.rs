//! Tracking counters and conversation memory

use chrono::Utc;
use serde::{Deserialize, Serialize};

use cafe_agent_core::IntentStage;
use cafe_agent_config::constants::flow;

use super::{ConversationState, DiscussedTopic, FieldId};

/// How engaged the user currently is, from response patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    #[default]
    High,
    Medium,
    Low,
}

impl ConversationState {
    // ====== RAG question tracking ======

    /// Increment the RAG question counter, returning the new count
    pub fn increment_rag_count(&mut self) -> u32 {
        self.rag_questions_count += 1;
        self.rag_questions_count
    }

    pub fn reset_rag_count(&mut self) {
        self.rag_questions_count = 0;
    }

    /// Remember a RAG question topic (truncated)
    pub fn add_rag_topic(&mut self, topic: &str) {
        let truncated: String = topic.chars().take(50).collect();
        self.rag_question_topics.push(truncated);
    }

    // ====== Contact refusal tracking ======

    /// Record that the user refused to provide contact information
    pub fn track_contact_refusal(&mut self, field: FieldId) {
        self.contact_refusal_count += 1;
        self.last_refused_field = Some(field);
        self.refusal_timestamps.push(Utc::now());
        tracing::info!(
            field = %field,
            total = self.contact_refusal_count,
            "Contact refusal tracked"
        );
    }

    /// Whether to stop asking for contact info after repeated refusals
    pub fn should_stop_asking_contact(&self) -> bool {
        self.contact_refusal_count >= flow::MAX_CONTACT_REFUSALS
    }

    /// Whether this field was refused within the recency window
    pub fn was_recently_refused(&self, field: FieldId) -> bool {
        if self.last_refused_field != Some(field) {
            return false;
        }
        match self.refusal_timestamps.last() {
            Some(last) => {
                (Utc::now() - *last).num_seconds() < flow::REFUSAL_RECENCY_SECS
            },
            None => false,
        }
    }

    // ====== Conversation memory ======

    /// Mark that a topic was discussed (so it is not re-asked)
    pub fn mark_topic_discussed(&mut self, topic: &str, value: &str) {
        let was_uncertain = matches!(value, "unclear" | super::TO_BE_DISCUSSED);
        self.discussed_topics.insert(
            topic.to_string(),
            DiscussedTopic {
                value: value.to_string(),
                timestamp: Some(Utc::now()),
                was_uncertain,
            },
        );
    }

    pub fn was_topic_discussed(&self, topic: &str) -> bool {
        self.discussed_topics.contains_key(topic)
    }

    /// Remember that the user was uncertain about a topic
    pub fn mark_user_uncertain(&mut self, topic: &str) {
        if !self.user_uncertainties.iter().any(|t| t == topic) {
            self.user_uncertainties.push(topic.to_string());
        }
    }

    // ====== Engagement tracking ======

    /// Update engagement from the user's response pattern
    pub fn track_user_engagement(&mut self, user_message: &str) {
        const BRIEF_RESPONSES: &[&str] =
            &["no", "ok", "okay", "sure", "yes", "nope", "nah", "fine"];

        let word_count = user_message.split_whitespace().count();
        let lower = user_message.trim().to_lowercase();

        if word_count <= 3 && BRIEF_RESPONSES.contains(&lower.as_str()) {
            self.brief_response_count += 1;
        } else {
            self.brief_response_count = self.brief_response_count.saturating_sub(1);
        }

        self.user_engagement_level = if self.brief_response_count >= 3 {
            EngagementLevel::Low
        } else if self.brief_response_count >= 2 {
            EngagementLevel::Medium
        } else {
            EngagementLevel::High
        };
    }

    // ====== Phrase repetition ======

    /// Whether a phrase was used in the last few responses
    pub fn was_phrase_recently_used(&self, phrase: &str, lookback: usize) -> bool {
        let start = self.recent_phrases.len().saturating_sub(lookback);
        self.recent_phrases[start..].iter().any(|p| p == phrase)
    }

    /// Remember a phrase the agent just used
    pub fn track_phrase_used(&mut self, phrase: &str) {
        self.recent_phrases.push(phrase.to_string());
        if self.recent_phrases.len() > flow::RECENT_PHRASES_KEPT {
            let drop = self.recent_phrases.len() - flow::RECENT_PHRASES_KEPT;
            self.recent_phrases.drain(..drop);
        }
    }

    // ====== Validation attempt counters ======

    pub fn increment_phone_attempts(&mut self) -> u32 {
        self.phone_validation_attempts += 1;
        self.phone_validation_attempts
    }

    pub fn reset_phone_attempts(&mut self) {
        self.phone_validation_attempts = 0;
    }

    /// Flag the phone number for manual review after repeated failures
    pub fn flag_phone_for_review(&mut self) {
        self.phone_needs_manual_review = true;
        tracing::info!("Phone flagged for manual review after max validation attempts");
    }

    pub fn increment_email_attempts(&mut self) -> u32 {
        self.email_validation_attempts += 1;
        self.email_validation_attempts
    }

    pub fn reset_email_attempts(&mut self) {
        self.email_validation_attempts = 0;
        self.email_typo_suggested = None;
    }

    pub fn set_email_typo_suggested(&mut self, suggested: &str) {
        self.email_typo_suggested = Some(suggested.to_string());
    }

    // ====== Stage transitions ======

    pub fn set_intent_stage(&mut self, stage: IntentStage) {
        tracing::info!(stage = %stage, "Intent stage changed");
        self.intent_stage = stage;
    }

    pub fn can_start_qualification(&self) -> bool {
        self.intent_stage.can_start_qualification()
    }

    /// Rewind to exploration mode; collected data is kept
    pub fn reset_to_exploration(&mut self) {
        let old = self.intent_stage;
        self.intent_stage = IntentStage::Exploring;
        self.rag_questions_count = 0;
        tracing::info!(from = %old, "Reset to exploration mode");
    }

    // ====== Field ask tracking ======

    /// Record that we asked for a field, returning the ask count
    pub fn track_field_ask(&mut self, field: FieldId) -> u32 {
        if self.current_field_being_asked != Some(field) {
            self.current_field_being_asked = Some(field);
            self.current_field_ask_count = 1;
        } else {
            self.current_field_ask_count += 1;
        }
        tracing::debug!(
            field = %field,
            count = self.current_field_ask_count,
            "Tracking field ask"
        );
        self.current_field_ask_count
    }

    pub fn reset_field_tracking(&mut self) {
        self.current_field_being_asked = None;
        self.current_field_ask_count = 0;
    }

    /// Whether the currently asked field should be auto-skipped
    pub fn should_skip_field(&self) -> bool {
        if self.current_field_ask_count < flow::MAX_FIELD_ASKS {
            return false;
        }
        match self.current_field_being_asked {
            Some(field) => self.is_skippable_field(field),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FieldValue;
    use cafe_agent_core::CustomerType;

    #[test]
    fn test_rag_counter() {
        let mut state = ConversationState::new();
        assert_eq!(state.increment_rag_count(), 1);
        assert_eq!(state.increment_rag_count(), 2);
        state.reset_rag_count();
        assert_eq!(state.rag_questions_count, 0);
    }

    #[test]
    fn test_contact_refusal_threshold() {
        let mut state = ConversationState::new();
        state.track_contact_refusal(FieldId::Phone);
        assert!(!state.should_stop_asking_contact());
        state.track_contact_refusal(FieldId::Email);
        assert!(state.should_stop_asking_contact());
        assert!(state.was_recently_refused(FieldId::Email));
        assert!(!state.was_recently_refused(FieldId::Phone));
    }

    #[test]
    fn test_engagement_levels() {
        let mut state = ConversationState::new();
        state.track_user_engagement("ok");
        state.track_user_engagement("sure");
        assert_eq!(state.user_engagement_level, EngagementLevel::Medium);
        state.track_user_engagement("no");
        assert_eq!(state.user_engagement_level, EngagementLevel::Low);

        // Detailed response recovers engagement
        state.track_user_engagement("we run three locations downtown and want training");
        assert_eq!(state.user_engagement_level, EngagementLevel::Medium);
    }

    #[test]
    fn test_phrase_ring() {
        let mut state = ConversationState::new();
        for i in 0..12 {
            state.track_phrase_used(&format!("phrase {}", i));
        }
        assert_eq!(state.recent_phrases.len(), 10);
        assert!(state.was_phrase_recently_used("phrase 11", 3));
        assert!(!state.was_phrase_recently_used("phrase 0", 3));
    }

    #[test]
    fn test_field_ask_tracking_and_skip() {
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);

        assert_eq!(state.track_field_ask(FieldId::Timeline), 1);
        assert!(!state.should_skip_field());
        assert_eq!(state.track_field_ask(FieldId::Timeline), 2);
        assert!(state.should_skip_field());

        // Required fields are never auto-skipped
        assert_eq!(state.track_field_ask(FieldId::Name), 1);
        assert_eq!(state.track_field_ask(FieldId::Name), 2);
        assert!(!state.should_skip_field());
    }

    #[test]
    fn test_set_field_resets_tracking() {
        let mut state = ConversationState::new();
        state.customer_type = Some(CustomerType::NewCafe);
        state.track_field_ask(FieldId::Timeline);
        state.set_field(FieldId::Timeline, FieldValue::Given("in_3_months".into()));
        assert!(state.current_field_being_asked.is_none());
        assert_eq!(state.current_field_ask_count, 0);
    }

    #[test]
    fn test_topic_memory() {
        let mut state = ConversationState::new();
        state.mark_topic_discussed("equipment", "unclear");
        assert!(state.was_topic_discussed("equipment"));
        assert!(state.discussed_topics["equipment"].was_uncertain);

        state.mark_user_uncertain("equipment");
        state.mark_user_uncertain("equipment");
        assert_eq!(state.user_uncertainties.len(), 1);
    }
}
