//! Mapping rules and the per-target rule table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::path::TargetPath;
use crate::value::{NOT_MAPPED, is_unset_literal};

/// Top-level shape of a mapping rule file: `{"data": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingFile {
    pub data: Vec<MappingRule>,
}

/// One row of the mapping rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingRule {
    /// Target leaf path, e.g. `personal.lastName` or `departments[0]`.
    #[serde(rename = "folio_field")]
    pub target: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub legacy_field: String,
    /// Literal value; keeps its JSON type.
    #[serde(default)]
    pub value: Value,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub fallback_legacy_field: String,
    #[serde(default)]
    pub fallback_value: Value,
    #[serde(default)]
    pub rules: RuleDirectives,
}

/// Transform directives attached to a rule (`"rules": {...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDirectives {
    #[serde(
        rename = "replaceValues",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub replace_values: BTreeMap<String, Value>,
    #[serde(
        rename = "regexGetFirstMatchOrEmpty",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub regex_get_first_match_or_empty: Option<String>,
    /// Named conditions; accepts `"trim, trim_period"` or `["trim", "trim_period"]`.
    #[serde(
        default,
        deserialize_with = "condition_names",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub conditions: Vec<String>,
}

impl RuleDirectives {
    pub fn is_empty(&self) -> bool {
        self.replace_values.is_empty()
            && self.regex_get_first_match_or_empty.is_none()
            && self.conditions.is_empty()
    }
}

impl MappingRule {
    /// Primary source column, unless unset or `"Not mapped"`.
    pub fn legacy_source(&self) -> Option<&str> {
        source_name(&self.legacy_field)
    }

    pub fn fallback_source(&self) -> Option<&str> {
        source_name(&self.fallback_legacy_field)
    }

    /// The literal value, unless unset.
    pub fn literal(&self) -> Option<&Value> {
        (!is_unset_literal(&self.value)).then_some(&self.value)
    }

    pub fn fallback_literal(&self) -> Option<&Value> {
        (!is_unset_literal(&self.fallback_value)).then_some(&self.fallback_value)
    }

    /// A rule that can produce a value for its target.
    pub fn is_active(&self) -> bool {
        self.legacy_source().is_some()
            || self.literal().is_some()
            || self.fallback_source().is_some()
            || self.fallback_literal().is_some()
    }
}

fn source_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    (!name.is_empty() && name != NOT_MAPPED).then_some(name)
}

/// Rules indexed by target path.
///
/// Inactive rows (no source, no literal) stay in the file for documentation
/// but are not indexed.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<MappingRule>,
    by_target: BTreeMap<String, Vec<usize>>,
    legacy_fields: BTreeSet<String>,
}

impl RuleTable {
    pub fn new(file: MappingFile) -> Result<Self> {
        let mut by_target: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut legacy_fields = BTreeSet::new();
        for (index, rule) in file.data.iter().enumerate() {
            if rule.target.trim().is_empty() {
                return Err(ModelError::InvalidRule {
                    index,
                    target: rule.target.clone(),
                    message: "folio_field is empty".to_string(),
                });
            }
            let path = TargetPath::parse(&rule.target).map_err(|err| ModelError::InvalidRule {
                index,
                target: rule.target.clone(),
                message: err.to_string(),
            })?;
            if !rule.is_active() {
                continue;
            }
            legacy_fields.extend(rule.legacy_source().map(str::to_string));
            legacy_fields.extend(rule.fallback_source().map(str::to_string));
            by_target.entry(path.to_string()).or_default().push(index);
        }
        Ok(Self {
            rules: file.data,
            by_target,
            legacy_fields,
        })
    }

    pub fn from_rules(rules: Vec<MappingRule>) -> Result<Self> {
        Self::new(MappingFile { data: rules })
    }

    /// Active rules for `target`, in declaration order.
    pub fn rules_for<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a MappingRule> + 'a {
        self.by_target
            .get(target)
            .into_iter()
            .flatten()
            .map(|&index| &self.rules[index])
    }

    pub fn rule_count(&self, target: &str) -> usize {
        self.by_target.get(target).map_or(0, Vec::len)
    }

    pub fn is_mapped(&self, target: &str) -> bool {
        self.by_target.contains_key(target)
    }

    /// Whether any mapped path lies under `prefix` (`prefix.` or `prefix[`).
    pub fn has_mapped_under(&self, prefix: &str) -> bool {
        self.by_target
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .any(|(key, _)| {
                let rest = &key[prefix.len()..];
                rest.starts_with('.') || rest.starts_with('[')
            })
    }

    pub fn mapped_targets(&self) -> impl Iterator<Item = &str> {
        self.by_target.keys().map(String::as_str)
    }

    /// Every legacy column referenced by a primary or fallback source.
    pub fn legacy_fields(&self) -> &BTreeSet<String> {
        &self.legacy_fields
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionNames {
    Joined(String),
    List(Vec<String>),
}

fn condition_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match Option::<ConditionNames>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ConditionNames::Joined(text)) => split_condition_names(&text),
        Some(ConditionNames::List(items)) => items
            .iter()
            .flat_map(|item| split_condition_names(item))
            .collect(),
    };
    Ok(names)
}

/// Split `"trim, remove_ending_punc"` into trimmed names.
pub fn split_condition_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: Value) -> MappingRule {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn deserializes_rule_with_directives() {
        let parsed = rule(json!({
            "folio_field": "personal.firstName",
            "legacy_field": "name",
            "value": "",
            "description": null,
            "rules": {
                "regexGetFirstMatchOrEmpty": ".*, (\\S+)",
                "replaceValues": {"0": "Non-Matriculated"},
                "conditions": "trim, trim_period"
            }
        }));
        assert_eq!(parsed.target, "personal.firstName");
        assert_eq!(parsed.legacy_source(), Some("name"));
        assert_eq!(parsed.literal(), None);
        assert_eq!(parsed.rules.conditions, vec!["trim", "trim_period"]);
        assert_eq!(
            parsed.rules.regex_get_first_match_or_empty.as_deref(),
            Some(".*, (\\S+)")
        );
        assert_eq!(
            parsed.rules.replace_values.get("0"),
            Some(&json!("Non-Matriculated"))
        );
    }

    #[test]
    fn not_mapped_source_is_unset() {
        let parsed = rule(json!({"folio_field": "barcode", "legacy_field": "Not mapped"}));
        assert_eq!(parsed.legacy_source(), None);
        assert!(!parsed.is_active());
    }

    #[test]
    fn boolean_literal_counts_as_set() {
        let parsed = rule(json!({"folio_field": "active", "legacy_field": "", "value": false}));
        assert_eq!(parsed.literal(), Some(&json!(false)));
        assert!(parsed.is_active());
    }

    #[test]
    fn table_indexes_active_rules_only() {
        let table = RuleTable::from_rules(vec![
            rule(json!({"folio_field": "username", "legacy_field": "user_name"})),
            rule(json!({"folio_field": "barcode", "legacy_field": "Not mapped"})),
            rule(json!({"folio_field": "departments[0]", "legacy_field": "dept"})),
            rule(json!({"folio_field": "departments[0]", "legacy_field": "dept2"})),
            rule(json!({
                "folio_field": "externalSystemId",
                "legacy_field": "ext_id",
                "fallback_legacy_field": "ext_id2"
            })),
        ])
        .unwrap();
        assert!(table.is_mapped("username"));
        assert!(!table.is_mapped("barcode"));
        assert_eq!(table.rule_count("departments[0]"), 2);
        assert!(table.has_mapped_under("departments"));
        assert!(!table.has_mapped_under("depart"));
        assert!(table.legacy_fields().contains("ext_id2"));
    }

    #[test]
    fn rejects_malformed_target() {
        let err = RuleTable::from_rules(vec![rule(json!({"folio_field": "a[", "legacy_field": "x"}))])
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRule { index: 0, .. }));
    }
}
