use serde::{Deserialize, Serialize};

/// JSON Schema primitive accepted by a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(name: &str, kind: ParamKind, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required,
        }
    }
}

/// Static descriptor of a callable operation offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Renders the parameters as a JSON Schema object.
    pub fn input_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({ "type": p.kind, "description": p.description }),
                )
            })
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params().collect::<Vec<_>>(),
        })
    }
}

/// Uniform envelope returned by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(serde_json::Value),
    Error(String),
}

impl ToolResult {
    pub fn ok(value: serde_json::Value) -> Self {
        Self::Success(value)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Error(message) => serde_json::json!({ "error": message }),
        }
    }

    /// Serialized form fed back to the model as tool-result content.
    pub fn to_content(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_required_params() {
        let spec = ToolSpec::new("read_announcement", "Read an announcement")
            .param(ParamSpec::new("filename", ParamKind::String, "File name", true))
            .param(ParamSpec::new("max_chars", ParamKind::Integer, "Limit", false));
        let schema = spec.input_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["filename"]["type"], "string");
        assert_eq!(schema["properties"]["max_chars"]["type"], "integer");
        assert_eq!(schema["required"], serde_json::json!(["filename"]));
    }

    #[test]
    fn parameterless_schema_has_empty_required() {
        let schema = ToolSpec::new("list_policies", "List policies").input_schema();
        assert_eq!(schema["properties"], serde_json::json!({}));
        assert_eq!(schema["required"], serde_json::json!([]));
    }

    #[test]
    fn error_result_serializes_as_error_object() {
        let result = ToolResult::error("Unknown tool: fly_to_moon");
        assert!(result.is_error());
        assert_eq!(result.to_content(), r#"{"error":"Unknown tool: fly_to_moon"}"#);
    }
}
