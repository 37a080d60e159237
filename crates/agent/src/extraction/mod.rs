//! Field extraction from user messages
//!
//! Primary path is a single LLM function call returning every plausible
//! field; a keyword fallback covers the "bot asked X, user answered tersely"
//! case without another round-trip.

pub mod fallback;
pub mod heuristics;
pub mod llm_extractor;
pub mod schema;

pub use fallback::extract_fallback;
pub(crate) use fallback::field_keywords as fallback_keywords;
pub use llm_extractor::LlmExtractor;

use async_trait::async_trait;

use cafe_agent_core::{CustomerType, Turn};

use crate::state::FieldId;

/// Fields pulled out of one message, in extraction order
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    /// Extracted (field, value) pairs; `"unclear"` is a value, absent is not
    pub fields: Vec<(FieldId, String)>,
    /// User named email as their preferred channel without giving one
    pub email_preference_indicated: bool,
    /// User named phone as their preferred channel without giving one
    pub phone_preference_indicated: bool,
}

impl ExtractionOutcome {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Extraction port
///
/// The flow controller only sees this trait, so tests drive it with scripted
/// extractors instead of a live model.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract fields from a message.
    ///
    /// `customer_type` of `None` means detection hasn't settled yet, which
    /// restricts extraction to contact info. `current_coffee_style_known`
    /// gates `coffee_preference` so it is never captured before the current
    /// style is on record. Failures degrade to an empty outcome.
    async fn extract(
        &self,
        message: &str,
        customer_type: Option<CustomerType>,
        history: &[Turn],
        current_coffee_style_known: bool,
    ) -> ExtractionOutcome;
}
