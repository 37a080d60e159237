//! Email validation with typo detection
//!
//! Allow-listed provider domains pass on syntax alone; every other domain
//! goes through the injected `DeliverabilityChecker`. Near-miss typos of
//! major providers come back as a suggested correction that the user must
//! confirm before we accept it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Deliverability port (DNS/MX lookups live behind this in deployment)
pub trait DeliverabilityChecker: Send + Sync {
    fn is_deliverable(&self, domain: &str) -> bool;
}

/// Accepts every domain; used where the deployment wires no real checker
pub struct PermissiveChecker;

impl DeliverabilityChecker for PermissiveChecker {
    fn is_deliverable(&self, _domain: &str) -> bool {
        true
    }
}

/// Outcome of validating one email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailValidation {
    /// Accepted, normalized to lowercase
    Valid { normalized: String },
    /// Looks like a typo; needs explicit user confirmation
    TypoSuspected { suggestion: String },
    /// Rejected with a user-facing reason
    Invalid { reason: String },
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Major providers accepted without a deliverability check
const WHITELISTED_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "yahoo.com",
    "yahoo.co.uk",
    "yahoo.ca",
    "yahoo.com.au",
    "ymail.com",
    "icloud.com",
    "me.com",
    "mac.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
    "zoho.com",
    "mail.com",
    "gmx.com",
];

/// Known mistyped domains mapped to their corrections
const KNOWN_TYPO_DOMAINS: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("gmil.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gmaill.com", "gmail.com"),
    ("gmailcom", "gmail.com"),
    ("yahooo.com", "yahoo.com"),
    ("yaho.com", "yahoo.com"),
    ("yhoo.com", "yahoo.com"),
    ("yahoocom", "yahoo.com"),
    ("outlok.com", "outlook.com"),
    ("outloo.com", "outlook.com"),
    ("outlookcom", "outlook.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmai.com", "hotmail.com"),
    ("hotmailcom", "hotmail.com"),
    ("icloudcom", "icloud.com"),
    ("aolcom", "aol.com"),
];

const MAJOR_PROVIDERS: &[&str] = &["gmail", "yahoo", "outlook", "hotmail", "icloud", "aol"];

/// Wrong TLDs commonly typed for `.com`
const COM_TYPO_TLDS: &[&str] = &["co", "cm", "con", "cmo", "comm", "ocm", "vom"];

fn is_whitelisted(domain: &str) -> bool {
    WHITELISTED_DOMAINS.contains(&domain)
        || domain.ends_with(".edu")
        || domain.ends_with(".ac.uk")
        || domain.ends_with(".edu.au")
}

/// One-or-two character edit difference, same rough length
fn is_near_miss(text: &str, target: &str) -> bool {
    if text == target || text.len().abs_diff(target.len()) > 2 {
        return false;
    }
    let differences = text
        .chars()
        .zip(target.chars())
        .filter(|(a, b)| a != b)
        .count()
        + text.len().abs_diff(target.len());
    (1..=2).contains(&differences)
}

/// Suggest a correction for a mistyped domain, if one looks likely
fn suggest_domain(domain: &str) -> Option<&'static str> {
    for (typo, correct) in KNOWN_TYPO_DOMAINS {
        if domain == *typo {
            return Some(correct);
        }
    }

    let base = domain.split('.').next().unwrap_or(domain);
    if let Some(tld) = domain.split('.').nth(1) {
        if MAJOR_PROVIDERS.contains(&base) && COM_TYPO_TLDS.contains(&tld) {
            return KNOWN_TYPO_DOMAINS
                .iter()
                .find(|(_, correct)| correct.starts_with(base))
                .map(|(_, correct)| *correct)
                .or(match base {
                    "gmail" => Some("gmail.com"),
                    "yahoo" => Some("yahoo.com"),
                    "outlook" => Some("outlook.com"),
                    "hotmail" => Some("hotmail.com"),
                    "icloud" => Some("icloud.com"),
                    "aol" => Some("aol.com"),
                    _ => None,
                });
        }
    }

    for provider in MAJOR_PROVIDERS {
        if is_near_miss(base, provider) && domain.ends_with(".com") {
            return match *provider {
                "gmail" => Some("gmail.com"),
                "yahoo" => Some("yahoo.com"),
                "outlook" => Some("outlook.com"),
                "hotmail" => Some("hotmail.com"),
                "icloud" => Some("icloud.com"),
                "aol" => Some("aol.com"),
                _ => None,
            };
        }
    }

    None
}

/// Email validator with allow-list and typo detection
pub struct EmailValidator {
    checker: Arc<dyn DeliverabilityChecker>,
}

impl EmailValidator {
    pub fn new(checker: Arc<dyn DeliverabilityChecker>) -> Self {
        Self { checker }
    }

    /// Validate and normalize an email address
    pub fn validate(&self, raw: &str) -> EmailValidation {
        let cleaned = raw.trim().to_lowercase();

        // Obvious slips first: stray spaces and doubled separators
        if cleaned.contains(' ') || cleaned.contains("@@") || cleaned.contains("..") {
            let fixed = cleaned.replace(' ', "").replace("@@", "@").replace("..", ".");
            if EMAIL_RE.is_match(&fixed) {
                return EmailValidation::TypoSuspected { suggestion: fixed };
            }
        }

        let (local, domain) = match cleaned.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => (local, domain),
            _ => {
                return EmailValidation::Invalid {
                    reason: "That doesn't look like an email address.".to_string(),
                }
            },
        };

        // Allow-listed domains win over typo heuristics (yahoo.co.uk is real)
        if EMAIL_RE.is_match(&cleaned) && is_whitelisted(domain) {
            return EmailValidation::Valid { normalized: cleaned };
        }

        if let Some(corrected) = suggest_domain(domain) {
            tracing::info!(domain, corrected, "Email typo suspected");
            return EmailValidation::TypoSuspected {
                suggestion: format!("{}@{}", local, corrected),
            };
        }

        if !EMAIL_RE.is_match(&cleaned) {
            return EmailValidation::Invalid {
                reason: "That doesn't look like an email address.".to_string(),
            };
        }

        if self.checker.is_deliverable(domain) {
            EmailValidation::Valid { normalized: cleaned }
        } else {
            EmailValidation::Invalid {
                reason: format!("I couldn't verify the domain {}.", domain),
            }
        }
    }
}
