//! Prompt helpers
//!
//! `ToolBuilder` constructs JSON-Schema tool definitions compatible with the
//! Chat Completions tool-calling format.

pub use cafe_agent_core::llm_types::{Message, Role, ToolDefinition};

/// Builder for creating `ToolDefinition`s with JSON Schema parameters
///
/// # Example
/// ```ignore
/// let tool = ToolBuilder::new("detect_customer_intent", "Classify the customer")
///     .param("customer_type", "string", "new_cafe, existing_cafe, or unclear", true)
///     .string_enum("customer_type", &["new_cafe", "existing_cafe", "unclear"])
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ToolBuilder {
    /// Create a new tool builder
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a parameter with type and description
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        let mut prop = serde_json::Map::new();
        prop.insert(
            "type".to_string(),
            serde_json::Value::String(param_type.to_string()),
        );
        prop.insert(
            "description".to_string(),
            serde_json::Value::String(description.into()),
        );

        self.properties.insert(name.clone(), serde_json::Value::Object(prop));

        if required {
            self.required.push(name);
        }
        self
    }

    /// Add enum constraint to an existing string parameter
    pub fn string_enum(mut self, name: &str, values: &[&str]) -> Self {
        if let Some(prop) = self.properties.get_mut(name) {
            if let Some(obj) = prop.as_object_mut() {
                let enum_values: Vec<serde_json::Value> = values
                    .iter()
                    .map(|v| serde_json::Value::String(v.to_string()))
                    .collect();
                obj.insert("enum".to_string(), serde_json::Value::Array(enum_values));
            }
        }
        self
    }

    /// Build the ToolDefinition
    pub fn build(self) -> ToolDefinition {
        let parameters = serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });

        ToolDefinition::new(self.name, self.description, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_builder() {
        let tool = ToolBuilder::new("detect_customer_intent", "Classify the customer")
            .param("customer_type", "string", "The detected type", true)
            .string_enum("customer_type", &["new_cafe", "existing_cafe", "unclear"])
            .param("reasoning", "string", "Brief explanation", false)
            .build();

        assert_eq!(tool.name, "detect_customer_intent");
        assert!(tool.parameters.is_object());
        assert_eq!(tool.parameters["required"][0], "customer_type");
        assert_eq!(
            tool.parameters["properties"]["customer_type"]["enum"][0],
            "new_cafe"
        );
    }
}
