//! Tool schemas for structured LLM calls

use cafe_agent_core::ToolDefinition;
use cafe_agent_llm::ToolBuilder;

/// Function schema for extracting customer data from a message
pub fn extraction_tool() -> ToolDefinition {
    ToolBuilder::new(
        "extract_customer_data",
        "Extract customer information from their message. Preserve their exact \
         terminology formatted lowercase with underscores; extract specific details \
         and reject vague responses; only extract what they actually said, never infer. \
         Call this for every user message.",
    )
    .param(
        "timeline",
        "string",
        "When they plan to open. Specific timeframes only ('in_3_months', 'early_2025', \
         'depends_on_funding'). 'unclear' for vague answers like 'soon' or 'sometime' \
         with no timeframe. Omit if not mentioned.",
        false,
    )
    .param(
        "coffee_style",
        "string",
        "Coffee style preference for the new café, preserving their exact words \
         ('dark_and_strong', 'single_origin_ethiopian'). Omit if not mentioned or unclear.",
        false,
    )
    .param(
        "equipment",
        "string",
        "Specific equipment situation ('no_equipment', 'have_2_espresso_machines', \
         'starting_from_scratch'). Omit if vague or not mentioned.",
        false,
    )
    .param(
        "volume",
        "string",
        "Expected daily volume, clear numbers only ('200_cups_daily', '100_to_150_per_day'). \
         'unclear' for anything non-specific ('busy', 'a lot'). Omit if not mentioned.",
        false,
    )
    .param(
        "current_pain_points",
        "string",
        "Supplier situation: specific issues ('late_deliveries', 'inconsistent_quality') or \
         satisfaction ('no_supplier_issues'). Opening statements like 'looking for a new \
         supplier' or vague complaints are NOT pain points - omit them.",
        false,
    )
    .param(
        "cafe_count",
        "string",
        "Number of cafés they operate, clear numbers only ('one_cafe', 'three_locations', \
         'two_cafes_expanding_to_four'). 'unclear' for 'few'/'several'. Omit if not mentioned.",
        false,
    )
    .param(
        "support_needs",
        "string",
        "Additional services beyond coffee supply ('barista_training', 'equipment_service', \
         'no_additional_services'). Only if explicitly mentioned; 'unclear' for vague asks. \
         Omit if not mentioned.",
        false,
    )
    .param(
        "current_coffee_style",
        "string",
        "Coffee styles they serve NOW ('dark_and_medium_roast', 'variety_of_specialty_blends'). \
         Omit if not mentioned.",
        false,
    )
    .param(
        "coffee_preference",
        "string",
        "Their response about exploring other styles ('satisfied_current', \
         'interested_ethiopian_single_origin', 'interested_general', 'maybe_interested'). \
         Only when they discuss trying NEW styles. Omit otherwise.",
        false,
    )
    .param(
        "name",
        "string",
        "Their name ('Sarah', 'John Smith'). Never pronouns like 'I' or 'me'. \
         Omit if not mentioned.",
        false,
    )
    .param(
        "phone",
        "string",
        "Phone number if actually provided. Omit when they only express a channel \
         preference ('phone', 'yes').",
        false,
    )
    .param(
        "email",
        "string",
        "Email address if actually provided. Omit when they only express a channel \
         preference ('email', 'yes').",
        false,
    )
    .build()
}

/// Function schema for customer-type and early-intent detection
pub fn type_detection_tool() -> ToolDefinition {
    ToolBuilder::new(
        "detect_customer_intent",
        "Determine whether the user is planning to open a NEW café or already \
         OWNS/OPERATES an existing café, and detect early action intents.",
    )
    .param(
        "customer_type",
        "string",
        "'new_cafe' (planning to open), 'existing_cafe' (owns/operates), or 'unclear'",
        true,
    )
    .string_enum("customer_type", &["new_cafe", "existing_cafe", "unclear"])
    .param("confidence", "string", "Confidence level in the detection", true)
    .string_enum("confidence", &["high", "medium", "low"])
    .param(
        "reasoning",
        "string",
        "Brief explanation of why this customer type was detected",
        true,
    )
    .param(
        "wants_to_place_order",
        "boolean",
        "True if the user wants to place an order or request samples",
        true,
    )
    .param(
        "wants_to_talk_to_person",
        "boolean",
        "True if the user wants to speak with a real person",
        true,
    )
    .param(
        "contact_info",
        "object",
        "Any name/phone/email mentioned in passing, as {name, phone, email}",
        false,
    )
    .build()
}

/// Function schema for question-vs-answer intent detection
pub fn question_intent_tool() -> ToolDefinition {
    ToolBuilder::new(
        "detect_question_intent",
        "Determine whether the user's message is asking a question (seeking \
         information) or providing an answer/statement.",
    )
    .param(
        "is_question",
        "boolean",
        "True if the user is asking a question, false if answering or stating",
        true,
    )
    .param("confidence", "string", "Confidence level in the detection", true)
    .string_enum("confidence", &["high", "medium", "low"])
    .param(
        "reasoning",
        "string",
        "Brief explanation of the classification",
        true,
    )
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_tool_shape() {
        let tool = extraction_tool();
        assert_eq!(tool.name, "extract_customer_data");
        let props = &tool.parameters["properties"];
        for key in [
            "timeline",
            "coffee_style",
            "equipment",
            "volume",
            "current_pain_points",
            "cafe_count",
            "support_needs",
            "current_coffee_style",
            "coffee_preference",
            "name",
            "phone",
            "email",
        ] {
            assert!(props.get(key).is_some(), "missing param {}", key);
        }
        // Nothing is required; absence means "not mentioned"
        assert!(tool.parameters["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_type_detection_tool_shape() {
        let tool = type_detection_tool();
        assert_eq!(tool.name, "detect_customer_intent");
        assert_eq!(
            tool.parameters["properties"]["customer_type"]["enum"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
    }
}
