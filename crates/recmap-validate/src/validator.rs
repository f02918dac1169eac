//! Final check on an assembled object before it is handed out.

use serde_json::{Map, Value};
use tracing::debug;

use recmap_model::{TargetPath, TargetSchema, is_empty_value};

use crate::error::{Result, ValidationError};

/// Bookkeeping fields removed from every object after validation.
pub const TRANSIENT_FIELDS: &[&str] = &["type"];

/// Required-field validator built from a schema's `required` list.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    required: Vec<TargetPath>,
    transient: Vec<String>,
}

impl Validator {
    /// Parse every required path of `schema`. Dot paths reach into nested
    /// objects (`personal.lastName`).
    pub fn new(schema: &TargetSchema) -> Result<Self> {
        let required = schema
            .required
            .iter()
            .map(|path| {
                TargetPath::parse(path).map_err(|source| ValidationError::InvalidRequiredPath {
                    path: path.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            required,
            transient: TRANSIENT_FIELDS.iter().map(ToString::to_string).collect(),
        })
    }

    pub fn with_transient_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transient = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.required.iter().map(ToString::to_string)
    }

    /// Required paths that are absent or blank in `object`.
    ///
    /// Booleans only have to be present; `false` satisfies the check.
    pub fn missing(&self, object: &Map<String, Value>) -> Vec<String> {
        self.required
            .iter()
            .filter(|path| path.lookup(object).is_none_or(is_empty_value))
            .map(ToString::to_string)
            .collect()
    }

    /// Check required fields, then strip transient fields.
    ///
    /// The object is left untouched when validation fails.
    pub fn validate(&self, object: &mut Map<String, Value>, record_id: &str) -> Result<()> {
        let missing = self.missing(object);
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired {
                record_id: record_id.to_string(),
                paths: missing,
            });
        }
        for field in &self.transient {
            if object.remove(field).is_some() {
                debug!(record = record_id, field = %field, "removed transient field");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> Validator {
        let schema = TargetSchema::from_json(&json!({
            "required": ["username", "active", "personal.lastName"],
            "properties": {
                "username": {"type": "string"},
                "active": {"type": "boolean"},
                "type": {"type": "string"},
                "personal": {"type": "object", "properties": {"lastName": {"type": "string"}}}
            }
        }))
        .unwrap();
        Validator::new(&schema).unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn false_satisfies_required_boolean() {
        let mut obj = object(json!({
            "username": "u1", "active": false, "personal": {"lastName": "Graney"}
        }));
        validator().validate(&mut obj, "1").unwrap();
    }

    #[test]
    fn blank_and_missing_paths_are_listed() {
        let mut obj = object(json!({"username": "  ", "active": true, "personal": {}}));
        let err = validator().validate(&mut obj, "rec-7").unwrap_err();
        assert_eq!(
            err.to_string(),
            "required field(s) missing or empty in record rec-7: username, personal.lastName"
        );
    }

    #[test]
    fn transient_type_marker_is_removed() {
        let mut obj = object(json!({
            "username": "u1", "active": true, "type": "user", "personal": {"lastName": "G"}
        }));
        validator().validate(&mut obj, "1").unwrap();
        assert!(!obj.contains_key("type"));
    }
}
