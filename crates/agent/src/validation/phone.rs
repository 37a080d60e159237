//! Phone validation with smart country detection
//!
//! Country is detected from the message text first ("+44", "UK"), then from
//! the number itself, then the caller's hint, then the default. Bare 10-digit
//! numbers default to US rather than failing; that leniency is intentional.

use once_cell::sync::Lazy;
use regex::Regex;

/// Why a phone number failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneError {
    TooFewDigits,
    TooManyDigits,
    Unparseable,
}

impl PhoneError {
    /// Friendly copy for user-facing re-prompts
    pub fn user_message(&self) -> &'static str {
        match self {
            PhoneError::TooFewDigits => {
                "Hmm, that looks a few digits short for a phone number."
            },
            PhoneError::TooManyDigits => {
                "That looks like too many digits for a phone number."
            },
            PhoneError::Unparseable => {
                "I couldn't quite read that as a phone number."
            },
        }
    }
}

/// A normalized phone number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPhone {
    /// E.164 format, e.g. `+15551234567`
    pub e164: String,
    /// ISO country code, e.g. `US`
    pub country: String,
}

/// Country name/alias to ISO code
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("united kingdom", "GB"),
    ("great britain", "GB"),
    ("britain", "GB"),
    ("england", "GB"),
    ("scotland", "GB"),
    ("wales", "GB"),
    ("uk", "GB"),
    ("united states", "US"),
    ("america", "US"),
    ("usa", "US"),
    ("us", "US"),
    ("australia", "AU"),
    ("canada", "CA"),
    ("new zealand", "NZ"),
    ("nz", "NZ"),
    ("ireland", "IE"),
    ("south africa", "ZA"),
    ("france", "FR"),
    ("germany", "DE"),
    ("spain", "ES"),
    ("italy", "IT"),
    ("netherlands", "NL"),
    ("india", "IN"),
    ("china", "CN"),
    ("japan", "JP"),
    ("singapore", "SG"),
    ("hong kong", "HK"),
    ("mexico", "MX"),
    ("brazil", "BR"),
];

/// ISO code to calling-code prefix
const CALLING_CODES: &[(&str, &str)] = &[
    ("US", "1"),
    ("CA", "1"),
    ("GB", "44"),
    ("AU", "61"),
    ("NZ", "64"),
    ("IE", "353"),
    ("ZA", "27"),
    ("FR", "33"),
    ("DE", "49"),
    ("ES", "34"),
    ("IT", "39"),
    ("NL", "31"),
    ("IN", "91"),
    ("CN", "86"),
    ("JP", "81"),
    ("SG", "65"),
    ("HK", "852"),
    ("MX", "52"),
    ("BR", "55"),
];

fn calling_code(country: &str) -> Option<&'static str> {
    CALLING_CODES
        .iter()
        .find(|(iso, _)| *iso == country)
        .map(|(_, code)| *code)
}

fn country_for_calling_code(code: &str) -> Option<&'static str> {
    // US/CA share +1; the first table entry wins
    CALLING_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(iso, _)| *iso)
}

static PLUS_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+(\d{1,3})").unwrap());

static PHONE_CANDIDATE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // International
        Regex::new(r"\+?\d{1,3}[-.\s]?\(?\d{1,4}\)?[-.\s]?\d{1,4}[-.\s]?\d{1,9}").unwrap(),
        // US format (555-123-4567)
        Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
        // Simple 7 digit (555-1234)
        Regex::new(r"\d{3}[-.\s]\d{4}").unwrap(),
    ]
});

/// Extract a country code mentioned in free text ("UK", "+44 number", ...)
pub fn extract_country_from_text(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();

    for (name, iso) in COUNTRY_NAMES {
        if lower.contains(name) {
            return Some(iso);
        }
    }

    if let Some(caps) = PLUS_CODE_RE.captures(text) {
        return country_for_calling_code(&caps[1]);
    }

    None
}

/// Detect country from the number's own calling-code prefix
pub fn detect_country_from_phone(phone: &str) -> Option<&'static str> {
    let trimmed = phone.trim();
    if !trimmed.starts_with('+') {
        return None;
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    // Longest prefix first so +852 is not read as +8
    for len in (1..=3).rev() {
        if digits.len() >= len {
            if let Some(iso) = country_for_calling_code(&digits[..len]) {
                return Some(iso);
            }
        }
    }
    None
}

/// Pull a phone-number-looking token out of free text
pub fn extract_phone_from_text(text: &str) -> Option<String> {
    for re in PHONE_CANDIDATE_RES.iter() {
        if let Some(m) = re.find(text) {
            let candidate = m.as_str().trim();
            let digit_count = candidate.chars().filter(|c| c.is_ascii_digit()).count();
            if digit_count >= 7 {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Format an E.164 number for user-friendly display
pub fn format_phone_for_display(phone: &str) -> String {
    if phone.starts_with("+1") && phone.len() == 12 {
        format!("+1 {} {} {}", &phone[2..5], &phone[5..8], &phone[8..])
    } else if phone.starts_with("+44") && phone.len() >= 12 {
        format!("+44 {} {}", &phone[3..7], &phone[7..])
    } else {
        phone.to_string()
    }
}

/// Phone validator with country detection
#[derive(Debug, Clone)]
pub struct PhoneValidator {
    default_country: String,
}

impl PhoneValidator {
    pub fn new(default_country: impl Into<String>) -> Self {
        Self {
            default_country: default_country.into(),
        }
    }

    /// Validate and normalize a phone number to E.164
    ///
    /// `user_message` is the full message the number came from, used for
    /// inline country detection.
    pub fn validate_and_format(
        &self,
        phone: &str,
        country_hint: Option<&str>,
        user_message: Option<&str>,
    ) -> Result<ValidatedPhone, PhoneError> {
        let detected = user_message
            .and_then(extract_country_from_text)
            .or_else(|| detect_country_from_phone(phone));

        let country = detected
            .map(str::to_string)
            .or_else(|| country_hint.map(str::to_string))
            .unwrap_or_else(|| self.default_country.clone());

        tracing::debug!(phone, %country, detected = ?detected, "Phone validation");

        let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let explicit_plus = phone.trim_start().starts_with('+');

        if digits.is_empty() {
            return Err(PhoneError::Unparseable);
        }

        // Local 7-digit numbers get the test area code before parsing
        if !explicit_plus && digits.len() == 7 {
            digits = format!("555{}", digits);
        }

        if explicit_plus {
            return Self::parse_international(&digits);
        }

        self.parse_national(&digits, &country)
    }

    fn parse_international(digits: &str) -> Result<ValidatedPhone, PhoneError> {
        if digits.len() < 8 {
            return Err(PhoneError::TooFewDigits);
        }
        if digits.len() > 15 {
            return Err(PhoneError::TooManyDigits);
        }
        for len in (1..=3).rev() {
            if digits.len() > len {
                if let Some(iso) = country_for_calling_code(&digits[..len]) {
                    return Ok(ValidatedPhone {
                        e164: format!("+{}", digits),
                        country: iso.to_string(),
                    });
                }
            }
        }
        Err(PhoneError::Unparseable)
    }

    fn parse_national(&self, digits: &str, country: &str) -> Result<ValidatedPhone, PhoneError> {
        let prefix = calling_code(country).ok_or(PhoneError::Unparseable)?;

        match country {
            "US" | "CA" => {
                // Lenient: any 10-digit number formats as +1XXXXXXXXXX
                if digits.len() == 10 {
                    Ok(ValidatedPhone {
                        e164: format!("+1{}", digits),
                        country: country.to_string(),
                    })
                } else if digits.len() == 11 && digits.starts_with('1') {
                    Ok(ValidatedPhone {
                        e164: format!("+{}", digits),
                        country: country.to_string(),
                    })
                } else if digits.len() < 10 {
                    Err(PhoneError::TooFewDigits)
                } else {
                    Err(PhoneError::TooManyDigits)
                }
            },
            _ => {
                // Generic national handling: strip a trunk zero, then length-check
                let national = digits.strip_prefix('0').unwrap_or(digits);
                let total = national.len() + prefix.len();
                if national.len() < 8 {
                    Err(PhoneError::TooFewDigits)
                } else if total > 15 {
                    Err(PhoneError::TooManyDigits)
                } else {
                    Ok(ValidatedPhone {
                        e164: format!("+{}{}", prefix, national),
                        country: country.to_string(),
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PhoneValidator {
        PhoneValidator::new("US")
    }

    #[test]
    fn test_bare_ten_digits_defaults_to_us() {
        let result = validator()
            .validate_and_format("5551234567", None, None)
            .unwrap();
        assert_eq!(result.e164, "+15551234567");
        assert_eq!(result.country, "US");
    }

    #[test]
    fn test_formatted_us_number() {
        let result = validator()
            .validate_and_format("(555) 123-4567", None, None)
            .unwrap();
        assert_eq!(result.e164, "+15551234567");
    }

    #[test]
    fn test_seven_digit_padded() {
        let result = validator().validate_and_format("123-4567", None, None).unwrap();
        assert_eq!(result.e164, "+15551234567");
    }

    #[test]
    fn test_country_from_message() {
        let result = validator()
            .validate_and_format("07911123456", None, Some("it's a UK number"))
            .unwrap();
        assert_eq!(result.country, "GB");
        assert!(result.e164.starts_with("+44"));
    }

    #[test]
    fn test_country_from_plus_prefix() {
        let result = validator()
            .validate_and_format("+447911123456", None, None)
            .unwrap();
        assert_eq!(result.country, "GB");
        assert_eq!(result.e164, "+447911123456");
    }

    #[test]
    fn test_too_few_digits() {
        assert_eq!(
            validator().validate_and_format("12345", None, None),
            Err(PhoneError::TooFewDigits)
        );
    }

    #[test]
    fn test_too_many_digits() {
        assert_eq!(
            validator().validate_and_format("+1234567890123456789", None, None),
            Err(PhoneError::TooManyDigits)
        );
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(
            validator().validate_and_format("call me maybe", None, None),
            Err(PhoneError::Unparseable)
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(format_phone_for_display("+17775551234"), "+1 777 555 1234");
        assert_eq!(format_phone_for_display("+447911123456"), "+44 7911 123456");
        assert_eq!(format_phone_for_display("+6598765432"), "+6598765432");
    }

    #[test]
    fn test_extract_phone_from_text() {
        assert_eq!(
            extract_phone_from_text("sure, it's 555-123-4567 thanks"),
            Some("555-123-4567".to_string())
        );
        assert_eq!(extract_phone_from_text("no numbers here"), None);
    }

    #[test]
    fn test_extract_country_from_text() {
        assert_eq!(extract_country_from_text("I'm in the United Kingdom"), Some("GB"));
        assert_eq!(extract_country_from_text("+61 412 345 678"), Some("AU"));
        assert_eq!(extract_country_from_text("hello there"), None);
    }
}
