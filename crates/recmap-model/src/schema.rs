//! Target schema tree.
//!
//! Only the subset of JSON schema the mapper needs is understood: `object`
//! with `properties`, `array` with object or string `items`, and scalar
//! leaves. Anything else is kept as [`NodeKind::Unsupported`] so the walker
//! can report it instead of failing the load.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ModelError, Result};
use crate::path::child_path;

/// Scalar leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Boolean,
    Number,
    Integer,
}

impl ScalarType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
        }
    }
}

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Object {
        properties: BTreeMap<String, PropertySchema>,
    },
    ObjectArray {
        properties: BTreeMap<String, PropertySchema>,
    },
    StringArray,
    Scalar {
        scalar: ScalarType,
    },
    /// A shape the mapper does not build; `in_array` marks unsupported item types.
    Unsupported { type_name: String, in_array: bool },
}

impl NodeKind {
    pub fn label(&self) -> String {
        match self {
            Self::Object { .. } => "object".to_string(),
            Self::ObjectArray { .. } => "array of object".to_string(),
            Self::StringArray => "array of string".to_string(),
            Self::Scalar { scalar } => scalar.as_str().to_string(),
            Self::Unsupported {
                type_name,
                in_array: true,
            } => format!("array of {type_name}"),
            Self::Unsupported { type_name, .. } => type_name.clone(),
        }
    }
}

/// One named property of the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub deprecated: bool,
    pub is_virtual: bool,
}

/// Root of a target schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSchema {
    pub title: String,
    pub properties: BTreeMap<String, PropertySchema>,
    /// Required leaves as dot paths.
    pub required: Vec<String>,
}

/// Flattened view of one schema leaf, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLeaf {
    pub path: String,
    pub kind: String,
    pub required: bool,
    pub deprecated: bool,
    pub is_virtual: bool,
}

impl TargetSchema {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| ModelError::InvalidSchema {
            path: String::new(),
            message: "schema root is not an object".to_string(),
        })?;
        let properties = match root.get("properties") {
            Some(props) => parse_properties(props, "")?,
            None => {
                return Err(ModelError::InvalidSchema {
                    path: String::new(),
                    message: "schema root has no properties".to_string(),
                });
            }
        };
        Ok(Self {
            title: root
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            properties,
            required: string_list(root.get("required")),
        })
    }

    pub fn is_required(&self, path: &str) -> bool {
        self.required.iter().any(|required| required == path)
    }

    /// Every leaf in the tree; array slots are written `name[]`.
    pub fn leaves(&self) -> Vec<SchemaLeaf> {
        let mut out = Vec::new();
        collect_leaves(&self.properties, "", self, &mut out);
        out
    }
}

fn collect_leaves(
    properties: &BTreeMap<String, PropertySchema>,
    parent: &str,
    schema: &TargetSchema,
    out: &mut Vec<SchemaLeaf>,
) {
    for (name, prop) in properties {
        let path = child_path(parent, name);
        match &prop.kind {
            NodeKind::Object { properties } => collect_leaves(properties, &path, schema, out),
            NodeKind::ObjectArray { properties } => {
                collect_leaves(properties, &format!("{path}[]"), schema, out);
            }
            kind => out.push(SchemaLeaf {
                required: schema.is_required(&path),
                kind: kind.label(),
                deprecated: prop.deprecated,
                is_virtual: prop.is_virtual,
                path,
            }),
        }
    }
}

fn parse_properties(value: &Value, parent: &str) -> Result<BTreeMap<String, PropertySchema>> {
    let map = value.as_object().ok_or_else(|| ModelError::InvalidSchema {
        path: parent.to_string(),
        message: "properties is not an object".to_string(),
    })?;
    map.iter()
        .map(|(name, node)| {
            let path = child_path(parent, name);
            parse_property(node, &path).map(|prop| (name.clone(), prop))
        })
        .collect()
}

fn parse_property(value: &Value, path: &str) -> Result<PropertySchema> {
    let node = value.as_object().ok_or_else(|| ModelError::InvalidSchema {
        path: path.to_string(),
        message: "property definition is not an object".to_string(),
    })?;
    let description = node
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let deprecated = node.get("deprecated").and_then(Value::as_bool) == Some(true)
        || description.trim().eq_ignore_ascii_case("deprecated");
    let is_virtual = node.get("folio:isVirtual").and_then(Value::as_bool) == Some(true);
    Ok(PropertySchema {
        kind: parse_kind(node, path)?,
        description,
        deprecated,
        is_virtual,
    })
}

fn parse_kind(node: &Map<String, Value>, path: &str) -> Result<NodeKind> {
    let type_name = node_type(node);
    let kind = match type_name.as_str() {
        "object" => match node.get("properties") {
            Some(props) => NodeKind::Object {
                properties: parse_properties(props, path)?,
            },
            None => NodeKind::Unsupported {
                type_name,
                in_array: false,
            },
        },
        "array" => {
            let items = node.get("items").and_then(Value::as_object);
            match items {
                Some(items) => {
                    let item_type = node_type(items);
                    match (item_type.as_str(), items.get("properties")) {
                        ("object", Some(props)) => NodeKind::ObjectArray {
                            properties: parse_properties(props, path)?,
                        },
                        ("string", _) => NodeKind::StringArray,
                        _ => NodeKind::Unsupported {
                            type_name: item_type,
                            in_array: true,
                        },
                    }
                }
                None => NodeKind::Unsupported {
                    type_name: "unknown".to_string(),
                    in_array: true,
                },
            }
        }
        "string" => NodeKind::Scalar {
            scalar: ScalarType::String,
        },
        "boolean" => NodeKind::Scalar {
            scalar: ScalarType::Boolean,
        },
        "number" => NodeKind::Scalar {
            scalar: ScalarType::Number,
        },
        "integer" => NodeKind::Scalar {
            scalar: ScalarType::Integer,
        },
        _ => NodeKind::Unsupported {
            type_name,
            in_array: false,
        },
    };
    Ok(kind)
}

/// Resolve `type`, accepting `["string", "null"]` and inferring from
/// `properties`/`items` when absent.
fn node_type(node: &Map<String, Value>) -> String {
    match node.get("type") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null")
            .unwrap_or("null")
            .to_string(),
        _ if node.contains_key("properties") => "object".to_string(),
        _ if node.contains_key("items") => "array".to_string(),
        _ => "string".to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_node_shapes() {
        let schema = TargetSchema::from_json(&json!({
            "title": "User",
            "required": ["username"],
            "properties": {
                "username": {"type": "string"},
                "active": {"type": "boolean"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "scores": {"type": "array", "items": {"type": "number"}},
                "notes": {"type": "array", "items": {"type": "object", "properties": {"text": {"type": "string"}}}},
                "legacy": {"type": "string", "description": "Deprecated"},
                "fullName": {"type": "string", "folio:isVirtual": true},
                "personal": {"type": "object", "properties": {"lastName": {"type": "string"}}},
                "opaque": {"type": "object"}
            }
        }))
        .unwrap();

        let kind = |name: &str| schema.properties[name].kind.clone();
        assert_eq!(kind("username"), NodeKind::Scalar { scalar: ScalarType::String });
        assert_eq!(kind("tags"), NodeKind::StringArray);
        assert!(matches!(kind("notes"), NodeKind::ObjectArray { .. }));
        assert!(matches!(kind("personal"), NodeKind::Object { .. }));
        assert_eq!(
            kind("scores"),
            NodeKind::Unsupported { type_name: "number".to_string(), in_array: true }
        );
        assert_eq!(
            kind("opaque"),
            NodeKind::Unsupported { type_name: "object".to_string(), in_array: false }
        );
        assert!(schema.properties["legacy"].deprecated);
        assert!(schema.properties["fullName"].is_virtual);
        assert!(schema.is_required("username"));
    }

    #[test]
    fn nullable_type_list_uses_first_concrete_type() {
        let schema = TargetSchema::from_json(&json!({
            "properties": {"expirationDate": {"type": ["null", "string"]}}
        }))
        .unwrap();
        assert_eq!(
            schema.properties["expirationDate"].kind,
            NodeKind::Scalar { scalar: ScalarType::String }
        );
    }

    #[test]
    fn leaves_flatten_nested_shapes() {
        let schema = TargetSchema::from_json(&json!({
            "required": ["personal.lastName"],
            "properties": {
                "personal": {"type": "object", "properties": {
                    "lastName": {"type": "string"},
                    "addresses": {"type": "array", "items": {"type": "object", "properties": {
                        "city": {"type": "string"}
                    }}}
                }}
            }
        }))
        .unwrap();
        let paths: Vec<_> = schema.leaves().into_iter().map(|leaf| (leaf.path, leaf.required)).collect();
        assert_eq!(
            paths,
            vec![
                ("personal.addresses[].city".to_string(), false),
                ("personal.lastName".to_string(), true),
            ]
        );
    }

    #[test]
    fn rejects_schema_without_properties() {
        assert!(TargetSchema::from_json(&json!({"type": "object"})).is_err());
        assert!(TargetSchema::from_json(&json!([])).is_err());
    }
}
