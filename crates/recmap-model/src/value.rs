use serde_json::Value;

/// Legacy-field sentinel meaning "no source column".
pub const NOT_MAPPED: &str = "Not mapped";

/// Whether a resolved value counts as empty for mapping and reporting.
///
/// Booleans and numbers are never empty: an explicit `false` is a value.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Literal cells in mapping files use `""`, `null` and `"Not mapped"` for "unset".
pub fn is_unset_literal(value: &Value) -> bool {
    match value {
        Value::String(text) => {
            let text = text.trim();
            text.is_empty() || text == NOT_MAPPED
        }
        other => is_empty_value(other),
    }
}

/// Render a value for report labels and log lines.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
