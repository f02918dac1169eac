//! Integration tests for loading mapping files and schemas.

use recmap_model::{MappingFile, RuleTable, TargetSchema};

const USER_SCHEMA: &str = r#"{
  "title": "User",
  "type": "object",
  "required": ["username", "patronGroup"],
  "properties": {
    "id": {"type": "string"},
    "username": {"type": "string"},
    "active": {"type": "boolean"},
    "patronGroup": {"type": "string"},
    "departments": {"type": "array", "items": {"type": "string"}},
    "personal": {
      "type": "object",
      "properties": {
        "lastName": {"type": "string"},
        "firstName": {"type": "string"},
        "addresses": {
          "type": "array",
          "items": {"type": "object", "properties": {"city": {"type": "string"}}}
        }
      }
    }
  }
}"#;

const USER_MAPPING: &str = r#"{
  "data": [
    {"folio_field": "username", "legacy_field": "user_name", "value": "", "description": ""},
    {"folio_field": "active", "legacy_field": "Not mapped", "value": true, "description": ""},
    {"folio_field": "id", "legacy_field": "Not mapped", "value": "", "description": ""},
    {"folio_field": "personal.lastName", "legacy_field": "name", "value": "", "description": "",
     "rules": {"regexGetFirstMatchOrEmpty": "(.*),.*"}},
    {"folio_field": "departments[0]", "legacy_field": "dept", "value": "", "description": ""}
  ]
}"#;

#[test]
fn schema_leaves_snapshot() {
    let schema = TargetSchema::from_json_str(USER_SCHEMA).unwrap();
    let leaves: Vec<String> = schema
        .leaves()
        .into_iter()
        .map(|leaf| format!("{} {} required={}", leaf.path, leaf.kind, leaf.required))
        .collect();
    insta::assert_json_snapshot!(leaves, @r#"
    [
      "active boolean required=false",
      "departments array of string required=false",
      "id string required=false",
      "patronGroup string required=true",
      "personal.addresses[].city string required=false",
      "personal.firstName string required=false",
      "personal.lastName string required=false",
      "username string required=true"
    ]
    "#);
}

#[test]
fn mapping_file_builds_rule_table() {
    let file: MappingFile = serde_json::from_str(USER_MAPPING).unwrap();
    let table = RuleTable::new(file).unwrap();
    let targets: Vec<&str> = table.mapped_targets().collect();
    assert_eq!(
        targets,
        vec!["active", "departments[0]", "personal.lastName", "username"]
    );
    assert!(table.has_mapped_under("personal"));
    assert!(!table.has_mapped_under("id"));
    let legacy: Vec<&str> = table.legacy_fields().iter().map(String::as_str).collect();
    assert_eq!(legacy, vec!["dept", "name", "user_name"]);
}
