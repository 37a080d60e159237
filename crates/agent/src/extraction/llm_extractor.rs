//! LLM-based field extraction using function calling

use std::sync::Arc;

use async_trait::async_trait;

use cafe_agent_config::constants::llm;
use cafe_agent_core::{CustomerType, ToolDefinition, Turn, TurnRole};
use cafe_agent_llm::{GenerateRequest, LlmBackend};

use crate::extraction::heuristics::{is_actual_email, is_actual_phone};
use crate::extraction::schema::extraction_tool;
use crate::extraction::{ExtractionOutcome, FieldExtractor};
use crate::state::FieldId;

/// Extraction order: contact info first, then per-type slots.
///
/// Order matters because the pipeline processes values sequentially and may
/// short-circuit with a clarification.
const EXTRACTION_ORDER: &[FieldId] = &[
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
];

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                },
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extractor backed by a single structured LLM call
pub struct LlmExtractor {
    backend: Arc<dyn LlmBackend>,
    tool: ToolDefinition,
}

impl LlmExtractor {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            tool: extraction_tool(),
        }
    }

    fn build_prompt(
        &self,
        message: &str,
        customer_type: Option<CustomerType>,
        history: &[Turn],
    ) -> String {
        let type_context = match customer_type {
            Some(CustomerType::NewCafe) => {
                "This is for someone OPENING A NEW CAFÉ. Use 'coffee_style' for their \
                 coffee preference."
            },
            Some(CustomerType::ExistingCafe) => {
                "This is for an EXISTING CAFÉ OWNER. Use 'current_coffee_style' for what \
                 they serve NOW; use 'coffee_preference' ONLY if they discuss exploring \
                 new or different styles."
            },
            None => "",
        };

        let mut recent = String::new();
        for turn in history.iter().rev().take(2).rev() {
            let speaker = match turn.role {
                TurnRole::User => "User",
                TurnRole::Bot => "Bot",
            };
            recent.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
        let context_str = if recent.is_empty() {
            String::new()
        } else {
            format!("\n\nRecent conversation:\n{}", recent)
        };

        let type_label = customer_type.map(|t| t.as_str()).unwrap_or("unclear");

        format!(
            "Extract SPECIFIC information from this user message. Be strict - only \
             extract clear, actionable data.\n\n\
             Current message: \"{message}\"{context_str}\n\n\
             Customer type: {type_label}\n{type_context}\n\n\
             Use 'unclear' for vague responses on a mentioned topic; omit fields not \
             mentioned at all. Preserve exact customer terminology with underscore \
             formatting. 'No issues' and 'no services' are valid specific responses.",
        )
    }

    fn post_process(
        &self,
        raw: serde_json::Value,
        message: &str,
        customer_type: Option<CustomerType>,
        current_coffee_style_known: bool,
    ) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => return outcome,
        };

        for field in EXTRACTION_ORDER {
            let value = match obj.get(field.as_str()).and_then(|v| v.as_str()) {
                Some(v) if !v.is_empty() && v != "null" => v.to_string(),
                _ => continue,
            };

            match field {
                FieldId::Name => {
                    outcome.fields.push((FieldId::Name, title_case(&value)));
                },
                FieldId::Email => {
                    if is_actual_email(&value) {
                        outcome.fields.push((FieldId::Email, value));
                    } else {
                        tracing::info!(%value, "Rejected email preference word");
                        outcome.email_preference_indicated = true;
                    }
                },
                FieldId::Phone => {
                    // Leave numeric validation to the pipeline so bad numbers
                    // get proper error copy; only drop obvious non-numbers.
                    let has_digit = value.chars().any(|c| c.is_ascii_digit());
                    if has_digit {
                        outcome.fields.push((FieldId::Phone, value));
                    } else if is_actual_phone(&value) {
                        outcome.fields.push((FieldId::Phone, value));
                    } else {
                        tracing::info!(%value, "Rejected phone preference word");
                        outcome.phone_preference_indicated = true;
                    }
                },
                FieldId::CoffeePreference => {
                    if current_coffee_style_known {
                        outcome.fields.push((FieldId::CoffeePreference, value));
                    } else {
                        tracing::info!(
                            "Holding back coffee_preference until current style is known"
                        );
                    }
                },
                other => {
                    outcome.fields.push((*other, value));
                },
            }
        }

        // Before type detection settles, only contact info may be captured
        if customer_type.is_none() {
            let before = outcome.fields.len();
            outcome.fields.retain(|(f, _)| f.is_contact());
            if outcome.fields.len() < before {
                tracing::info!(
                    dropped = before - outcome.fields.len(),
                    "Exploration mode - kept contact fields only"
                );
            }
        }

        if !outcome.fields.is_empty() {
            tracing::info!(
                fields = ?outcome.fields.iter().map(|(f, _)| f.as_str()).collect::<Vec<_>>(),
                message,
                "LLM extracted fields"
            );
        }
        outcome
    }
}

#[async_trait]
impl FieldExtractor for LlmExtractor {
    async fn extract(
        &self,
        message: &str,
        customer_type: Option<CustomerType>,
        history: &[Turn],
        current_coffee_style_known: bool,
    ) -> ExtractionOutcome {
        let prompt = self.build_prompt(message, customer_type, history);
        let request = GenerateRequest::from_prompt(prompt)
            .with_forced_tool(self.tool.clone())
            .with_temperature(0.0)
            .with_max_tokens(llm::EXTRACTION_MAX_TOKENS);

        match self.backend.generate(request).await {
            Ok(outcome) => match outcome.tool_call("extract_customer_data") {
                Some(call) => self.post_process(
                    call.arguments.clone(),
                    message,
                    customer_type,
                    current_coffee_style_known,
                ),
                None => {
                    tracing::warn!("LLM did not call the extraction function");
                    ExtractionOutcome::default()
                },
            },
            Err(e) => {
                tracing::error!(error = %e, "LLM extraction failed");
                ExtractionOutcome::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_agent_llm::LlmError;

    struct NoopBackend;

    #[async_trait]
    impl LlmBackend for NoopBackend {
        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<cafe_agent_llm::LlmOutcome, LlmError> {
            Err(LlmError::Api("down".to_string()))
        }

        fn model_name(&self) -> &str {
            "noop"
        }
    }

    fn extractor() -> LlmExtractor {
        LlmExtractor::new(Arc::new(NoopBackend))
    }

    #[test]
    fn test_post_process_filters_nulls_and_titlecases_name() {
        let outcome = extractor().post_process(
            serde_json::json!({
                "name": "sarah jones",
                "timeline": "null",
                "volume": "200_cups_daily"
            }),
            "msg",
            Some(CustomerType::NewCafe),
            false,
        );
        assert_eq!(outcome.get(FieldId::Name), Some("Sarah Jones"));
        assert_eq!(outcome.get(FieldId::Volume), Some("200_cups_daily"));
        assert_eq!(outcome.get(FieldId::Timeline), None);
    }

    #[test]
    fn test_preference_words_set_flags() {
        let outcome = extractor().post_process(
            serde_json::json!({"email": "email", "phone": "phone"}),
            "email please",
            Some(CustomerType::NewCafe),
            false,
        );
        assert!(outcome.is_empty());
        assert!(outcome.email_preference_indicated);
        assert!(outcome.phone_preference_indicated);
    }

    #[test]
    fn test_unknown_type_keeps_contact_only() {
        let outcome = extractor().post_process(
            serde_json::json!({"name": "Sam", "timeline": "in_3_months"}),
            "msg",
            None,
            false,
        );
        assert_eq!(outcome.fields.len(), 1);
        assert_eq!(outcome.get(FieldId::Name), Some("Sam"));
    }

    #[test]
    fn test_coffee_preference_held_back() {
        let raw = serde_json::json!({"coffee_preference": "interested_general"});
        let held = extractor().post_process(
            raw.clone(),
            "msg",
            Some(CustomerType::ExistingCafe),
            false,
        );
        assert!(held.is_empty());

        let kept = extractor().post_process(raw, "msg", Some(CustomerType::ExistingCafe), true);
        assert_eq!(kept.get(FieldId::CoffeePreference), Some("interested_general"));
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_empty() {
        let outcome = extractor()
            .extract("I want to open a café", Some(CustomerType::NewCafe), &[], false)
            .await;
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_invalid_phone_still_passed_through() {
        // Bad numbers flow to the pipeline for proper error copy
        let outcome = extractor().post_process(
            serde_json::json!({"phone": "636737"}),
            "636737",
            Some(CustomerType::NewCafe),
            false,
        );
        assert_eq!(outcome.get(FieldId::Phone), Some("636737"));
    }
}
