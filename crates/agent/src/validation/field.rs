//! Name cleanup and vagueness detection

/// Self-reference prefixes stripped off extracted names
const NAME_PREFIXES: &[&str] = &[
    "my name is ",
    "my name's ",
    "i'm ",
    "i am ",
    "call me ",
    "it's ",
    "this is ",
    "name is ",
];

/// Bare pronouns that are never names
const PRONOUNS: &[&str] = &["i'm", "i am", "my", "me", "i"];

/// Validate and clean a name; `Err` carries the re-prompt text
pub fn validate_name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();

    if PRONOUNS.contains(&lower.as_str()) {
        return Err("Could you share your full name?".to_string());
    }

    let mut cleaned = trimmed.to_string();
    for prefix in NAME_PREFIXES {
        if lower.starts_with(prefix) {
            cleaned = trimmed.get(prefix.len()..).unwrap_or("").trim().to_string();
            break;
        }
    }

    let cleaned_lower = cleaned.to_lowercase();
    if cleaned.len() < 2 || PRONOUNS.contains(&cleaned_lower.as_str()) {
        return Err("Could you share your full name?".to_string());
    }

    Ok(cleaned)
}

/// "No issues" answers that are valid, specific responses
const NO_ISSUES_RESPONSES: &[&str] = &[
    "no_supplier_issues",
    "satisfied_with_supplier",
    "no_problems",
    "no_issues",
    "satisfied_with_current",
    "supplier_is_fine",
];

/// Phrases that name a problem without describing it
const VAGUE_PHRASES: &[&str] = &[
    "few problems",
    "some problems",
    "some issues",
    "few issues",
    "problems",
    "issues",
    "not happy",
    "not satisfied",
    "not good",
    "bad",
    "terrible",
    "awful",
    "not great",
    "could be better",
];

const VAGUE_WORDS: &[&str] = &["problem", "issue", "bad", "not", "some", "few"];

const VAGUE_STARTERS: &[&str] = &[
    "i have few",
    "i have some",
    "there are few",
    "there are some",
    "got few",
    "got some",
];

/// Whether a pain-point answer is too vague to store
pub fn is_vague_pain_point(pain_point: &str) -> bool {
    let lower = pain_point.trim().to_lowercase();

    if NO_ISSUES_RESPONSES.contains(&lower.as_str()) {
        return false;
    }

    if VAGUE_PHRASES.contains(&lower.as_str()) {
        return true;
    }

    let word_count = pain_point.split_whitespace().count();
    if word_count < 3 && VAGUE_WORDS.iter().any(|w| lower.contains(w)) {
        return true;
    }

    VAGUE_STARTERS.iter().any(|s| lower.starts_with(s))
}
