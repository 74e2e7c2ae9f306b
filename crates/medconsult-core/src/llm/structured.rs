//! JSON-schema constrained generation helpers.
//!
//! Schemas are derived from the Rust output types with `schemars` and
//! tightened for strict structured-output mode. Decoding fails closed: any
//! response that does not parse into the target type is a
//! `ProviderMalformedOutput`, never a best-effort partial value.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use medconsult_types::error::ConsultError;
use medconsult_types::llm::OutputConfig;

/// Maximum number of raw response characters echoed into error messages.
const PREVIEW_CHARS: usize = 200;

/// Recursively mark every object schema as closed with all properties required.
///
/// Strict structured-output endpoints reject schemas that leave
/// `additionalProperties` open or omit properties from `required`.
pub fn add_additional_properties_false(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                let required: Vec<serde_json::Value> = props
                    .keys()
                    .map(|k| serde_json::Value::String(k.clone()))
                    .collect();
                map.insert("required".to_string(), serde_json::Value::Array(required));
                map.insert(
                    "additionalProperties".to_string(),
                    serde_json::Value::Bool(false),
                );
            }
            for child in map.values_mut() {
                add_additional_properties_false(child);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                add_additional_properties_false(item);
            }
        }
        _ => {}
    }
}

/// Generate the strict JSON schema for `T`.
pub fn strict_schema<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value = schema.to_value();
    add_additional_properties_false(&mut value);
    value
}

/// Build an `OutputConfig` constraining output to `T`'s schema.
pub fn output_config_for<T: JsonSchema>(name: &str) -> OutputConfig {
    OutputConfig::json_schema(name, strict_schema::<T>())
}

/// Strip a surrounding markdown code fence (```json ... ```), if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a model response into `T`, failing closed.
pub fn decode<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, ConsultError> {
    let body = strip_code_fences(raw);
    serde_json::from_str::<T>(body).map_err(|e| {
        ConsultError::ProviderMalformedOutput(format!(
            "failed to parse {what}: {e}; raw content: {}",
            preview(body)
        ))
    })
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medconsult_types::memory::{DetectedActions, TurnInsight};

    #[test]
    fn test_strip_code_fences_with_language_tag() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_passthrough() {
        assert_eq!(strip_code_fences("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn test_insight_schema_is_closed_and_fully_required() {
        let schema = strict_schema::<TurnInsight>();
        assert_eq!(schema["additionalProperties"], false);
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert!(required.contains(&serde_json::json!("insight_found")));
    }

    #[test]
    fn test_nested_definitions_are_closed() {
        let schema = strict_schema::<DetectedActions>();
        let defs = schema["$defs"].as_object().unwrap();
        let action = &defs["ConditionAction"];
        assert_eq!(action["additionalProperties"], false);
        assert!(
            action["required"]
                .as_array()
                .unwrap()
                .contains(&serde_json::json!("certainty_level"))
        );
    }

    #[test]
    fn test_decode_fails_closed_on_missing_field() {
        let result: Result<TurnInsight, _> = decode(r#"{"insight_found": true}"#, "insight");
        match result {
            Err(ConsultError::ProviderMalformedOutput(msg)) => {
                assert!(msg.contains("insight"));
            }
            other => panic!("expected malformed output, got {other:?}"),
        }
    }

    #[test]
    fn test_output_config_uses_type_name() {
        let config = output_config_for::<TurnInsight>("TurnInsight");
        assert_eq!(config.format.json_schema.name, "TurnInsight");
        assert_eq!(config.format.json_schema.strict, Some(true));
    }
}
