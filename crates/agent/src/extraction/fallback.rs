//! Keyword fallback extraction
//!
//! Covers the common case where the bot just asked for a field and the user
//! gave a short unqualified reply, without another LLM round-trip.

use crate::state::FieldId;

/// Keywords in the bot's question that identify which field it asked for
pub(crate) fn field_keywords(field: FieldId) -> &'static [&'static str] {
    match field {
        FieldId::Timeline => &["when", "timeline", "planning to open", "planning"],
        FieldId::CoffeeStyle => {
            &["coffee style", "style", "bold", "classic", "specialty", "coffee"]
        },
        FieldId::Equipment => &["equipment", "machine", "gear", "have"],
        FieldId::Volume => &["volume", "cups", "daily", "serve", "many"],
        FieldId::CurrentPainPoints => {
            &["pain", "issue", "problem", "frustrat", "experiencing", "supplier"]
        },
        FieldId::CafeCount => &["how many", "locations", "cafés", "café"],
        FieldId::SupportNeeds => &["support", "help", "need"],
        FieldId::CurrentCoffeeStyle => &["current", "currently", "serve now", "offering now"],
        FieldId::CoffeePreference => {
            &["exploring", "try different", "other styles", "interested in"]
        },
        FieldId::Name => &["name", "call you", "who"],
        FieldId::Phone => &["phone", "number"],
        FieldId::Email => &["email"],
    }
}

/// Extract the next missing field from a short reply when the bot's last
/// question clearly asked for it. Returns at most one field.
pub fn extract_fallback(
    user_message: &str,
    last_bot_message: &str,
    missing_fields: &[FieldId],
) -> Option<(FieldId, String)> {
    if last_bot_message.is_empty() {
        return None;
    }
    let next_field = *missing_fields.first()?;

    let bot_lower = last_bot_message.to_lowercase();
    let asked_for_it = field_keywords(next_field)
        .iter()
        .any(|kw| bot_lower.contains(kw));

    if asked_for_it {
        let value = user_message.trim().to_string();
        if value.is_empty() {
            return None;
        }
        tracing::info!(field = %next_field, %value, "Fallback extracted");
        return Some((next_field, value));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_matches_asked_field() {
        let result = extract_fallback(
            "in about 3 months",
            "When are you thinking of opening your café?",
            &[FieldId::Timeline, FieldId::CoffeeStyle],
        );
        assert_eq!(result, Some((FieldId::Timeline, "in about 3 months".to_string())));
    }

    #[test]
    fn test_fallback_skips_unrelated_question() {
        let result = extract_fallback(
            "in about 3 months",
            "What flavor profile are you looking for?",
            &[FieldId::Timeline],
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_fallback_requires_bot_message_and_missing_fields() {
        assert_eq!(extract_fallback("hi", "", &[FieldId::Name]), None);
        assert_eq!(extract_fallback("hi", "who am I chatting with?", &[]), None);
    }
}
