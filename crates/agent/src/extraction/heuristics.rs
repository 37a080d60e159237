//! Regex heuristics over raw user text

use once_cell::sync::Lazy;
use regex::Regex;

use crate::state::FieldId;

static REFUSAL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bno\b",
        r"\bnope\b",
        r"\bnah\b",
        r"\bdon'?t want\b",
        r"\bwon'?t share\b",
        r"\brefuse\b",
        r"\bnot comfortable\b",
        r"\bdon'?t have\b",
        r"\bi said no\b",
        r"\balready said\b",
        r"\bstop asking\b",
        r"\bprivacy\b",
        r"\bpersonal\b",
        r"\bmaybe not\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HUMAN_CONNECTION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"connect.*real person",
        r"connect.*person",
        r"talk.*human",
        r"talk.*person",
        r"talk.*someone",
        r"speak.*human",
        r"speak.*person",
        r"speak.*someone",
        r"real person",
        r"human agent",
        r"actual person",
        r"connect me",
        r"transfer.*human",
        r"escalate",
        r"talk.*real",
        r"speak.*real",
        r"can i.*person",
        r"want.*person",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static EMAIL_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

/// Whether the user is refusing to provide information
pub fn detect_refusal(user_message: &str) -> bool {
    let lower = user_message.to_lowercase();
    let refused = REFUSAL_RES.iter().any(|re| re.is_match(&lower));
    if refused {
        tracing::info!(message = user_message, "Refusal detected");
    }
    refused
}

/// Whether the user wants to reach a real person
pub fn detect_human_connection_request(user_message: &str) -> bool {
    let lower = user_message.to_lowercase();
    let requested = HUMAN_CONNECTION_RES.iter().any(|re| re.is_match(&lower));
    if requested {
        tracing::info!(message = user_message, "Human connection request detected");
    }
    requested
}

/// Preference words that are not contact values
const EMAIL_PREFERENCE_WORDS: &[&str] =
    &["email", "e-mail", "mail", "yes", "sure", "okay", "ok", "yep", "yeah"];
const PHONE_PREFERENCE_WORDS: &[&str] =
    &["phone", "call", "number", "mobile", "cell", "yes", "sure", "okay", "ok"];

/// Whether text is an actual email address rather than a channel preference
pub fn is_actual_email(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || EMAIL_PREFERENCE_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        return false;
    }
    trimmed.contains('@') && EMAIL_SHAPE_RE.is_match(trimmed)
}

/// Whether text is an actual phone number rather than a channel preference
pub fn is_actual_phone(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || PHONE_PREFERENCE_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        return false;
    }
    trimmed.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

/// Extract an email-shaped token from free text
pub fn extract_email_from_text(text: &str) -> Option<String> {
    EMAIL_SHAPE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Whether an extracted value is consistent with what the user actually said
///
/// Coffee-style extractions must share at least one token with the message;
/// a hallucinated style is worse than a missed one.
pub fn validate_extraction_consistency(
    user_message: &str,
    field: FieldId,
    extracted_value: &str,
) -> bool {
    if field != FieldId::CoffeeStyle || extracted_value.is_empty() {
        return true;
    }

    let message_lower = user_message.to_lowercase();
    let user_words: std::collections::HashSet<&str> = message_lower.split_whitespace().collect();
    let value_lower = extracted_value.to_lowercase().replace('_', " ");
    let overlaps = value_lower.split_whitespace().any(|w| user_words.contains(w));

    if !overlaps {
        tracing::warn!(
            message = user_message,
            extracted = extracted_value,
            "Extraction mismatch - discarding coffee style"
        );
    }
    overlaps
}

/// Whether the message is a bare number needing a unit clarification
pub fn is_ambiguous_number(user_message: &str, field: FieldId) -> bool {
    if !matches!(field, FieldId::Volume | FieldId::Timeline) {
        return false;
    }
    let stripped: String = user_message
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_detection() {
        assert!(detect_refusal("I don't want to give my number"));
        assert!(detect_refusal("no thanks"));
        assert!(detect_refusal("that's personal"));
        assert!(!detect_refusal("sure, it's 555-123-4567"));
    }

    #[test]
    fn test_human_connection_detection() {
        assert!(detect_human_connection_request("can I talk to a real person?"));
        assert!(detect_human_connection_request("connect me with your team"));
        assert!(!detect_human_connection_request("what blends do you offer?"));
    }

    #[test]
    fn test_actual_email_vs_preference() {
        assert!(is_actual_email("sam@gmail.com"));
        assert!(!is_actual_email("email"));
        assert!(!is_actual_email("yes"));
        assert!(!is_actual_email("sam at gmail"));
    }

    #[test]
    fn test_actual_phone_vs_preference() {
        assert!(is_actual_phone("555-123-4567"));
        assert!(!is_actual_phone("phone"));
        assert!(!is_actual_phone("call"));
        assert!(!is_actual_phone("12345"));
    }

    #[test]
    fn test_coffee_style_consistency() {
        assert!(validate_extraction_consistency(
            "I like it dark and strong",
            FieldId::CoffeeStyle,
            "dark_and_strong"
        ));
        assert!(!validate_extraction_consistency(
            "something smooth please",
            FieldId::CoffeeStyle,
            "bold_espresso"
        ));
        // Other fields pass through
        assert!(validate_extraction_consistency(
            "whatever",
            FieldId::Volume,
            "200_cups_daily"
        ));
    }

    #[test]
    fn test_ambiguous_number() {
        assert!(is_ambiguous_number("200", FieldId::Volume));
        assert!(is_ambiguous_number("3.5", FieldId::Timeline));
        assert!(!is_ambiguous_number("200 cups a day", FieldId::Volume));
        assert!(!is_ambiguous_number("200", FieldId::CafeCount));
    }
}
