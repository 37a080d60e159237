//! Qualification field identifiers and values

use serde::{Deserialize, Serialize};

use cafe_agent_core::CustomerType;

/// Sentinel stored when a field was skipped for the team to follow up on
pub const TO_BE_DISCUSSED: &str = "to_be_discussed_with_team";

/// Sentinel stored when the user explicitly refused a field
pub const USER_DECLINED: &str = "user_declined";

/// Every qualification and contact slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    // Contact fields (both customer types)
    Name,
    Phone,
    Email,
    // New café fields
    Timeline,
    CoffeeStyle,
    Equipment,
    Volume,
    // Existing café fields
    CurrentPainPoints,
    CafeCount,
    SupportNeeds,
    CurrentCoffeeStyle,
    CoffeePreference,
}

impl FieldId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::Phone => "phone",
            FieldId::Email => "email",
            FieldId::Timeline => "timeline",
            FieldId::CoffeeStyle => "coffee_style",
            FieldId::Equipment => "equipment",
            FieldId::Volume => "volume",
            FieldId::CurrentPainPoints => "current_pain_points",
            FieldId::CafeCount => "cafe_count",
            FieldId::SupportNeeds => "support_needs",
            FieldId::CurrentCoffeeStyle => "current_coffee_style",
            FieldId::CoffeePreference => "coffee_preference",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(FieldId::Name),
            "phone" => Some(FieldId::Phone),
            "email" => Some(FieldId::Email),
            "timeline" => Some(FieldId::Timeline),
            "coffee_style" => Some(FieldId::CoffeeStyle),
            "equipment" => Some(FieldId::Equipment),
            "volume" => Some(FieldId::Volume),
            "current_pain_points" => Some(FieldId::CurrentPainPoints),
            "cafe_count" => Some(FieldId::CafeCount),
            "support_needs" => Some(FieldId::SupportNeeds),
            "current_coffee_style" => Some(FieldId::CurrentCoffeeStyle),
            "coffee_preference" => Some(FieldId::CoffeePreference),
            _ => None,
        }
    }

    /// Contact fields are shared by both customer types
    pub fn is_contact(&self) -> bool {
        matches!(self, FieldId::Name | FieldId::Phone | FieldId::Email)
    }

    /// Required fields shown in context (contact channels handled separately)
    pub fn required_fields(_customer_type: CustomerType) -> &'static [FieldId] {
        &[FieldId::Name]
    }

    /// Preferred fields per customer type (nice to have, skippable)
    pub fn preferred_fields(customer_type: CustomerType) -> &'static [FieldId] {
        match customer_type {
            CustomerType::NewCafe => &[
                FieldId::Timeline,
                FieldId::CoffeeStyle,
                FieldId::Equipment,
                FieldId::Volume,
            ],
            CustomerType::ExistingCafe => &[
                FieldId::CurrentPainPoints,
                FieldId::CafeCount,
                FieldId::SupportNeeds,
                FieldId::CurrentCoffeeStyle,
                FieldId::CoffeePreference,
            ],
        }
    }

    /// Commitment-signal fields that upgrade interest to confirmed intent
    pub fn commitment_signals(customer_type: CustomerType) -> &'static [FieldId] {
        match customer_type {
            CustomerType::NewCafe => {
                &[FieldId::Timeline, FieldId::Equipment, FieldId::Volume]
            },
            CustomerType::ExistingCafe => {
                &[FieldId::CurrentPainPoints, FieldId::CafeCount]
            },
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A collected field value
///
/// Three-valued: a real answer, an explicit skip, or an explicit refusal.
/// Sentinel strings are preserved on the wire so state round-trips with the
/// caller's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// User-provided value
    Given(String),
    /// Skipped, team will cover it ("to_be_discussed_with_team")
    ToBeDiscussed,
    /// User refused to provide it ("user_declined")
    Declined,
}

impl FieldValue {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            TO_BE_DISCUSSED => FieldValue::ToBeDiscussed,
            USER_DECLINED => FieldValue::Declined,
            other => FieldValue::Given(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Given(s) => s.as_str(),
            FieldValue::ToBeDiscussed => TO_BE_DISCUSSED,
            FieldValue::Declined => USER_DECLINED,
        }
    }

    /// A real user answer (not a sentinel)
    pub fn is_given(&self) -> bool {
        matches!(self, FieldValue::Given(_))
    }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldValue::from_raw(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_id_round_trip() {
        for id in [
            FieldId::Name,
            FieldId::Phone,
            FieldId::Email,
            FieldId::Timeline,
            FieldId::CoffeeStyle,
            FieldId::Equipment,
            FieldId::Volume,
            FieldId::CurrentPainPoints,
            FieldId::CafeCount,
            FieldId::SupportNeeds,
            FieldId::CurrentCoffeeStyle,
            FieldId::CoffeePreference,
        ] {
            assert_eq!(FieldId::from_str(id.as_str()), Some(id));
        }
    }

    #[test]
    fn test_field_value_sentinels() {
        assert_eq!(
            FieldValue::from_raw("to_be_discussed_with_team"),
            FieldValue::ToBeDiscussed
        );
        assert_eq!(FieldValue::from_raw("user_declined"), FieldValue::Declined);
        assert!(FieldValue::from_raw("bold_coffee").is_given());
        assert!(!FieldValue::Declined.is_given());
    }

    #[test]
    fn test_field_value_serde() {
        let value = FieldValue::ToBeDiscussed;
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"to_be_discussed_with_team\"");
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_preferred_fields_per_type() {
        assert_eq!(FieldId::preferred_fields(CustomerType::NewCafe).len(), 4);
        assert_eq!(FieldId::preferred_fields(CustomerType::ExistingCafe).len(), 5);
    }
}
