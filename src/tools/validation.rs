//! Top-level argument checks run before a local tool handler.

use serde_json::Value;

use super::types::{RAW_INPUT_KEY, SESSION_KEY};

/// Check arguments against an object schema.
///
/// Covers object shape, `required` presence, declared property types and
/// string `enum` membership. Reserved keys are always accepted. Returns the
/// first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    let Some(obj) = args.as_object() else {
        if schema.get("type").and_then(Value::as_str) == Some("object") {
            return Err(format!("expected object arguments, got {}", json_type_name(args)));
        }
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        if let Some(missing) = required
            .iter()
            .filter_map(Value::as_str)
            .find(|name| !obj.contains_key(*name))
        {
            return Err(format!("missing required field '{missing}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        if key == SESSION_KEY || key == RAW_INPUT_KEY {
            continue;
        }
        let Some(prop) = properties.get(key) else {
            continue;
        };
        if let Some(expected) = prop.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, expected) {
                return Err(format!(
                    "field '{key}' expected type '{expected}', got {}",
                    json_type_name(value)
                ));
            }
        }
        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(format!("field '{key}' is not one of the allowed values"));
            }
        }
    }
    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" },
                "days": { "type": "integer" },
                "unit": { "type": "string", "enum": ["c", "f"] },
            },
            "required": ["city"],
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({"city": "Shenzhen", "days": 2});
        assert!(validate_arguments(&args, &weather_schema()).is_ok());
    }

    #[test]
    fn reports_missing_required_field() {
        let err = validate_arguments(&json!({"days": 2}), &weather_schema()).unwrap_err();
        assert_eq!(err, "missing required field 'city'");
    }

    #[test]
    fn reports_type_mismatch() {
        let args = json!({"city": "x", "days": "two"});
        let err = validate_arguments(&args, &weather_schema()).unwrap_err();
        assert!(err.contains("field 'days' expected type 'integer'"));
    }

    #[test]
    fn reports_value_outside_enum() {
        let args = json!({"city": "x", "unit": "k"});
        let err = validate_arguments(&args, &weather_schema()).unwrap_err();
        assert!(err.contains("'unit'"));
    }

    #[test]
    fn reserved_keys_are_ignored() {
        let args = json!({"city": "x", "_session_key_": "slot"});
        assert!(validate_arguments(&args, &weather_schema()).is_ok());
    }

    #[test]
    fn rejects_non_object_for_object_schema() {
        let err = validate_arguments(&json!([1]), &weather_schema()).unwrap_err();
        assert!(err.contains("expected object"));
    }
}
