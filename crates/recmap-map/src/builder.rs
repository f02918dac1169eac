use serde_json::{Map, Value};

use recmap_model::is_empty_value;

/// Owns one subtree of the object under construction.
///
/// A child builder is committed to its parent only when it holds data, so
/// empty nested objects never appear in the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectBuilder {
    fields: Map<String, Value>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Append to a string array, skipping values already present.
    pub fn push_unique(&mut self, name: &str, value: Value) {
        let slot = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot
            && !items.contains(&value)
        {
            items.push(value);
        }
    }

    /// Append to an object array.
    pub fn push(&mut self, name: &str, value: Value) {
        let slot = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(is_empty_value)
    }

    /// Move this subtree into `parent` under `name` if it holds any data.
    pub fn commit_into(self, parent: &mut ObjectBuilder, name: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        parent.set(name, Value::Object(self.fields));
        true
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}
