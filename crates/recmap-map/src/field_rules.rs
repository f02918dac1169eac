//! Tag-driven mapping of repeatable fields (MARC-style rules).
//!
//! A rules file maps a field tag to a list of mappings. Each mapping writes
//! the joined subfield values of every instance of the tag to a target, or
//! builds an entity object from its `entity` sub-mappings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use recmap_model::{
    FieldInstance, LegacyRecord, LegacyValue, MappingOptions, NodeKind, TargetSchema,
    split_condition_names,
};
use recmap_report::MigrationReport;
use recmap_report::sections::UNMAPPED_TAGS;

use crate::conditions::ConditionPipeline;
use crate::error::{FieldIssue, MapError, Result};

/// Field rules file: tag -> mappings.
pub type FieldRulesFile = BTreeMap<String, Vec<FieldMapping>>;

/// One mapping of a tag, as written in the rules file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub target: String,
    /// Subfield codes to read; empty reads every subfield.
    #[serde(default)]
    pub subfield: Vec<String>,
    #[serde(default)]
    pub rules: Vec<FieldRule>,
    #[serde(rename = "applyRulesOnConcatenatedData", default)]
    pub apply_rules_on_concatenated_data: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<FieldMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub conditions: Vec<FieldCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Comma-separated condition names.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldMapping {
    fn condition_names(&self) -> Vec<String> {
        self.rules
            .first()
            .map(|rule| {
                rule.conditions
                    .iter()
                    .flat_map(|condition| split_condition_names(&condition.kind))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Where a mapping writes, resolved against the schema at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    /// Top-level scalar, overwritten.
    Scalar(String),
    /// Top-level string array, appended without duplicates.
    StringArray(String),
    /// `object.leaf`.
    ObjectField { parent: String, leaf: String },
    /// `array.leaf`: each value becomes a new element.
    ArrayField { parent: String, leaf: String },
}

#[derive(Debug, Clone)]
struct CompiledLeaf {
    leaf: String,
    subfields: Vec<String>,
    conditions: ConditionPipeline,
    concatenated: bool,
}

#[derive(Debug, Clone)]
enum CompiledMapping {
    Value {
        placement: Placement,
        source: CompiledLeaf,
    },
    Entity {
        parent: String,
        is_array: bool,
        members: Vec<CompiledLeaf>,
    },
}

/// Compiled field rules.
#[derive(Debug, Clone, Default)]
pub struct FieldRuleMapper {
    rules: BTreeMap<String, Vec<CompiledMapping>>,
}

impl FieldRuleMapper {
    /// Compile `file` against `schema`. Mappings whose target the schema
    /// does not define are dropped with a warning.
    pub fn new(
        file: FieldRulesFile,
        schema: &TargetSchema,
        options: &MappingOptions,
    ) -> Result<Self> {
        let mut rules = BTreeMap::new();
        for (tag, mappings) in file {
            let mut compiled = Vec::with_capacity(mappings.len());
            for mapping in &mappings {
                match compile_mapping(&tag, mapping, schema, options)? {
                    Some(mapping) => compiled.push(mapping),
                    None => warn!(
                        tag = %tag,
                        field = %mapping.target,
                        "field rule target not in schema, skipped"
                    ),
                }
            }
            rules.insert(tag, compiled);
        }
        Ok(Self { rules })
    }

    pub fn has_rules_for(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to `record`, writing into `object`.
    pub fn apply(
        &self,
        record: &LegacyRecord,
        object: &mut Map<String, Value>,
        report: &mut MigrationReport,
    ) {
        let mut used = BTreeSet::new();
        self.apply_with_used(record, object, report, &mut used);
        for tag in &used {
            report.report_legacy_mapped(tag);
        }
    }

    /// Like [`apply`](Self::apply), but tags that wrote a value are added
    /// to `used` instead of being counted.
    pub fn apply_with_used(
        &self,
        record: &LegacyRecord,
        object: &mut Map<String, Value>,
        report: &mut MigrationReport,
        used: &mut BTreeSet<String>,
    ) {
        for (tag, value) in record.fields() {
            let Some(mappings) = self.rules.get(tag) else {
                report.add(UNMAPPED_TAGS, tag);
                continue;
            };
            let mut wrote = false;
            match value {
                LegacyValue::Repeated(instances) => {
                    for instance in instances {
                        for mapping in mappings {
                            wrote |= apply_mapping(mapping, Source::Field(instance), object, report);
                        }
                    }
                }
                LegacyValue::Single(text) => {
                    for mapping in mappings {
                        wrote |= apply_mapping(mapping, Source::Control(text), object, report);
                    }
                }
            }
            if wrote {
                used.insert(tag.to_string());
            }
        }
    }
}

fn compile_mapping(
    tag: &str,
    mapping: &FieldMapping,
    schema: &TargetSchema,
    options: &MappingOptions,
) -> Result<Option<CompiledMapping>> {
    if !mapping.entity.is_empty() {
        let Some(first) = mapping.entity.first() else {
            return Ok(None);
        };
        let parent = first.target.split('.').next().unwrap_or_default().to_string();
        let is_array = match schema.properties.get(&parent).map(|prop| &prop.kind) {
            Some(NodeKind::ObjectArray { .. }) => true,
            Some(NodeKind::Object { .. }) => false,
            _ => return Ok(None),
        };
        let members = mapping
            .entity
            .iter()
            .map(|member| {
                let leaf = member.target.rsplit('.').next().unwrap_or_default().to_string();
                compile_leaf(tag, member, leaf, options)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(CompiledMapping::Entity {
            parent,
            is_array,
            members,
        }));
    }

    let segments: Vec<&str> = mapping.target.split('.').collect();
    let placement = match segments.as_slice() {
        [name] => match schema.properties.get(*name).map(|prop| &prop.kind) {
            Some(NodeKind::Scalar { .. }) => Placement::Scalar(name.to_string()),
            Some(NodeKind::StringArray) => Placement::StringArray(name.to_string()),
            _ => return Ok(None),
        },
        [parent, leaf] => match schema.properties.get(*parent).map(|prop| &prop.kind) {
            Some(NodeKind::Object { properties }) if properties.contains_key(*leaf) => {
                Placement::ObjectField {
                    parent: parent.to_string(),
                    leaf: leaf.to_string(),
                }
            }
            Some(NodeKind::ObjectArray { properties }) if properties.contains_key(*leaf) => {
                Placement::ArrayField {
                    parent: parent.to_string(),
                    leaf: leaf.to_string(),
                }
            }
            _ => return Ok(None),
        },
        _ => {
            return Err(MapError::InvalidFieldRule {
                tag: tag.to_string(),
                message: format!("target '{}' is nested too deeply", mapping.target),
            });
        }
    };
    let source = compile_leaf(tag, mapping, String::new(), options)?;
    Ok(Some(CompiledMapping::Value { placement, source }))
}

fn compile_leaf(
    tag: &str,
    mapping: &FieldMapping,
    leaf: String,
    options: &MappingOptions,
) -> Result<CompiledLeaf> {
    let names = mapping.condition_names();
    let label = format!("{tag} -> {}", mapping.target);
    let conditions = ConditionPipeline::parse(names.as_slice(), options.condition_mode, &label)?;
    Ok(CompiledLeaf {
        leaf,
        subfields: mapping.subfield.clone(),
        conditions,
        concatenated: mapping.apply_rules_on_concatenated_data,
    })
}

#[derive(Clone, Copy)]
enum Source<'a> {
    Field(&'a FieldInstance),
    Control(&'a str),
}

/// Subfield values joined with spaces, conditions applied per subfield or
/// to the joined text.
fn extract(source: &CompiledLeaf, from: Source<'_>, report: &mut MigrationReport) -> String {
    match from {
        Source::Control(text) => source.conditions.apply(text, None, report),
        Source::Field(instance) => {
            let indicator2 = instance.indicator2_digit();
            let values: Vec<&str> = instance.subfield_values(&source.subfields).collect();
            if source.concatenated {
                source.conditions.apply(&values.join(" "), indicator2, report)
            } else {
                values
                    .iter()
                    .map(|value| source.conditions.apply(value, indicator2, report))
                    .filter(|value| !value.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }
}

fn apply_mapping(
    mapping: &CompiledMapping,
    from: Source<'_>,
    object: &mut Map<String, Value>,
    report: &mut MigrationReport,
) -> bool {
    match mapping {
        CompiledMapping::Value { placement, source } => {
            let value = extract(source, from, report);
            let value = value.trim();
            if value.is_empty() {
                return false;
            }
            write_value(placement, value.to_string(), object, report)
        }
        CompiledMapping::Entity {
            parent,
            is_array,
            members,
        } => {
            let mut entity = Map::new();
            for member in members {
                let value = extract(member, from, report);
                let value = value.trim();
                if !value.is_empty() {
                    entity.insert(member.leaf.clone(), Value::String(value.to_string()));
                }
            }
            if entity.is_empty() {
                return false;
            }
            if *is_array {
                push_array(object, parent, Value::Object(entity), report)
            } else {
                object.insert(parent.clone(), Value::Object(entity));
                true
            }
        }
    }
}

fn write_value(
    placement: &Placement,
    value: String,
    object: &mut Map<String, Value>,
    report: &mut MigrationReport,
) -> bool {
    match placement {
        Placement::Scalar(name) => {
            object.insert(name.clone(), Value::String(value));
            true
        }
        Placement::StringArray(name) => {
            let slot = object
                .entry(name.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => {
                    let value = Value::String(value);
                    if !items.contains(&value) {
                        items.push(value);
                    }
                    true
                }
                _ => {
                    conflict(name, "an array", report);
                    false
                }
            }
        }
        Placement::ObjectField { parent, leaf } => {
            let slot = object
                .entry(parent.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(fields) => {
                    fields.insert(leaf.clone(), Value::String(value));
                    true
                }
                _ => {
                    conflict(parent, "an object", report);
                    false
                }
            }
        }
        Placement::ArrayField { parent, leaf } => {
            let mut element = Map::new();
            element.insert(leaf.clone(), Value::String(value));
            push_array(object, parent, Value::Object(element), report)
        }
    }
}

fn push_array(
    object: &mut Map<String, Value>,
    name: &str,
    element: Value,
    report: &mut MigrationReport,
) -> bool {
    let slot = object
        .entry(name.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => {
            debug!(target_field = name, "appending entity");
            items.push(element);
            true
        }
        _ => {
            conflict(name, "an array", report);
            false
        }
    }
}

fn conflict(target: &str, expected: &'static str, report: &mut MigrationReport) {
    FieldIssue::ShapeConflict {
        target: target.to_string(),
        expected,
    }
    .report(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap_model::Subfield;
    use serde_json::json;

    fn schema() -> TargetSchema {
        TargetSchema::from_json(&json!({
            "properties": {
                "title": {"type": "string"},
                "hrid": {"type": "string"},
                "subjects": {"type": "array", "items": {"type": "string"}},
                "identifiers": {"type": "array", "items": {"type": "object", "properties": {
                    "value": {"type": "string"},
                    "identifierTypeId": {"type": "string"}
                }}}
            }
        }))
        .unwrap()
    }

    fn mapper(rules: Value) -> FieldRuleMapper {
        let file: FieldRulesFile = serde_json::from_value(rules).unwrap();
        FieldRuleMapper::new(file, &schema(), &MappingOptions::default()).unwrap()
    }

    #[test]
    fn title_with_indicator_prefix_and_punctuation() {
        let mapper = mapper(json!({
            "245": [{
                "target": "title",
                "subfield": ["a", "b"],
                "applyRulesOnConcatenatedData": true,
                "rules": [{"conditions": [{"type": "remove_prefix_by_indicator, remove_ending_punc"}]}]
            }]
        }));
        let mut record = LegacyRecord::new();
        record.push_field(
            "245",
            FieldInstance::new("1", "4", vec![Subfield::new("a", "The cat :"), Subfield::new("b", "a tale /")]),
        );
        let mut object = Map::new();
        let mut report = MigrationReport::new();
        mapper.apply(&record, &mut object, &mut report);
        assert_eq!(object.get("title"), Some(&json!("cat : a tale")));
    }

    #[test]
    fn string_arrays_are_deduplicated_and_unmapped_tags_counted() {
        let mapper = mapper(json!({
            "650": [{"target": "subjects", "subfield": ["a"],
                     "rules": [{"conditions": [{"type": "trim_period"}]}]}]
        }));
        let mut record = LegacyRecord::new();
        for subject in ["Cats.", "Dogs", "Cats"] {
            record.push_field("650", FieldInstance::new(" ", "0", vec![Subfield::new("a", subject)]));
        }
        record.push_field("999", FieldInstance::new("f", "f", vec![Subfield::new("i", "x")]));
        let mut object = Map::new();
        let mut report = MigrationReport::new();
        mapper.apply(&record, &mut object, &mut report);
        assert_eq!(object.get("subjects"), Some(&json!(["Cats", "Dogs"])));
        assert_eq!(report.measure(UNMAPPED_TAGS, "999"), 1);
        assert_eq!(report.legacy_field("650").map(|counts| counts.mapped), Some(1));
    }

    #[test]
    fn entity_mappings_append_objects() {
        let mapper = mapper(json!({
            "020": [{"entity": [
                {"target": "identifiers.identifierTypeId", "subfield": ["q"]},
                {"target": "identifiers.value", "subfield": ["a"],
                 "rules": [{"conditions": [{"type": "trim"}]}]}
            ]}]
        }));
        let mut record = LegacyRecord::new();
        record.push_field(
            "020",
            FieldInstance::new(" ", " ", vec![Subfield::new("a", " 9780 "), Subfield::new("q", "ISBN")]),
        );
        record.push_field("020", FieldInstance::new(" ", " ", vec![Subfield::new("a", "1234")]));
        let mut object = Map::new();
        let mut report = MigrationReport::new();
        mapper.apply(&record, &mut object, &mut report);
        assert_eq!(
            object.get("identifiers"),
            Some(&json!([
                {"identifierTypeId": "ISBN", "value": "9780"},
                {"value": "1234"}
            ]))
        );
    }

    #[test]
    fn control_fields_map_whole_value() {
        let mapper = mapper(json!({"001": [{"target": "hrid", "rules": []}]}));
        let mut record = LegacyRecord::new();
        record.insert("001", " in00001 ");
        let mut object = Map::new();
        mapper.apply(&record, &mut object, &mut MigrationReport::new());
        assert_eq!(object.get("hrid"), Some(&json!("in00001")));
    }

    #[test]
    fn targets_missing_from_schema_are_dropped() {
        let mapper = mapper(json!({"100": [{"target": "contributors", "subfield": ["a"]}]}));
        assert!(mapper.has_rules_for("100"));
        let mut record = LegacyRecord::new();
        record.push_field("100", FieldInstance::new("1", " ", vec![Subfield::new("a", "Name")]));
        let mut object = Map::new();
        mapper.apply(&record, &mut object, &mut MigrationReport::new());
        assert!(object.is_empty());
    }
}
