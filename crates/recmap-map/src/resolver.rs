//! Value resolution for one target leaf.
//!
//! Precedence, first satisfied step wins:
//! 1. the literal of the only rule for the path,
//! 2. the primary legacy fields (transformed, then joined),
//! 3. the fallback legacy fields,
//! 4. the fallback literal.

use serde_json::Value;
use tracing::debug;

use recmap_model::{LegacyRecord, MappingOptions, display_value, is_empty_value};
use recmap_report::MigrationReport;
use recmap_report::sections::{DEFAULT_VALUES, VALUE_SUBSTITUTIONS};

use crate::rules::{CompiledRule, RuleSet};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Literal,
    Legacy,
    FallbackLegacy,
    FallbackLiteral,
}

/// Outcome of resolving one path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub value: Option<Value>,
    pub source: Option<ValueSource>,
    /// Legacy fields whose data ended up in `value`.
    pub used_fields: Vec<String>,
}

impl Resolution {
    fn absent() -> Self {
        Self::default()
    }

    fn resolved(value: Value, source: ValueSource, used_fields: Vec<String>) -> Self {
        Self {
            value: Some(value),
            source: Some(source),
            used_fields,
        }
    }
}

/// Applies the precedence chain against a compiled rule set.
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'a> {
    rules: &'a RuleSet,
    options: &'a MappingOptions,
}

impl<'a> ValueResolver<'a> {
    pub fn new(rules: &'a RuleSet, options: &'a MappingOptions) -> Self {
        Self { rules, options }
    }

    /// Resolve `target` for `record`; absent when nothing produced a value.
    pub fn resolve(
        &self,
        target: &str,
        record: &LegacyRecord,
        report: &mut MigrationReport,
    ) -> Resolution {
        let rules = self.rules.rules_for(target);
        if let [only] = rules
            && let Some(literal) = only.rule.literal()
        {
            report.add(
                DEFAULT_VALUES,
                &format!("{target}: {}", display_value(literal)),
            );
            debug!(target_field = target, "literal value from mapping file");
            return Resolution::resolved(literal.clone(), ValueSource::Literal, Vec::new());
        }

        let primary = rules
            .iter()
            .filter_map(|rule| rule.rule.legacy_source().map(|field| (rule, field)));
        if let Some((value, used)) = self.gather(target, primary, record, report) {
            return Resolution::resolved(value, ValueSource::Legacy, used);
        }

        let fallback = rules
            .iter()
            .filter_map(|rule| rule.rule.fallback_source().map(|field| (rule, field)));
        if let Some((value, used)) = self.gather(target, fallback, record, report) {
            debug!(target_field = target, "value taken from fallback legacy field");
            return Resolution::resolved(value, ValueSource::FallbackLegacy, used);
        }

        if let Some(literal) = rules.iter().find_map(|rule| rule.rule.fallback_literal()) {
            debug!(target_field = target, "fallback value from mapping file");
            return Resolution::resolved(literal.clone(), ValueSource::FallbackLiteral, Vec::new());
        }

        Resolution::absent()
    }

    /// Read, transform and join the given legacy fields.
    fn gather<'r, I>(
        &self,
        target: &str,
        sources: I,
        record: &LegacyRecord,
        report: &mut MigrationReport,
    ) -> Option<(Value, Vec<String>)>
    where
        I: Iterator<Item = (&'r CompiledRule, &'r str)>,
    {
        let mut values = Vec::new();
        let mut used = Vec::new();
        for (rule, field) in sources {
            let Some(raw) = record.text(field) else {
                continue;
            };
            if let Some(value) = transform(rule, target, field, &raw, record, report) {
                values.push(value);
                used.push(field.to_string());
            }
        }
        match values.len() {
            0 => None,
            1 => values.pop().map(|value| (value, used)),
            _ => {
                let joined = values
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join(&self.options.multi_field_delimiter);
                Some((Value::String(joined), used))
            }
        }
    }
}

/// Conditions, then regex extraction, then `replaceValues`.
fn transform(
    rule: &CompiledRule,
    target: &str,
    field: &str,
    raw: &str,
    record: &LegacyRecord,
    report: &mut MigrationReport,
) -> Option<Value> {
    let conditioned = rule
        .conditions
        .apply(raw.trim(), record.indicator2(field), report);
    let extracted = rule.extract(&conditioned);
    let value = match rule.replacement(&extracted) {
        Some(replacement) => {
            report.add(
                VALUE_SUBSTITUTIONS,
                &format!("{target}: {extracted} -> {}", display_value(replacement)),
            );
            replacement.clone()
        }
        None => Value::String(extracted),
    };
    (!is_empty_value(&value)).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap_model::{MappingRule, RuleTable};
    use serde_json::json;

    fn rule_set(rules: Value) -> RuleSet {
        let rules: Vec<MappingRule> = serde_json::from_value(rules).unwrap();
        RuleSet::new(RuleTable::from_rules(rules).unwrap(), &MappingOptions::default()).unwrap()
    }

    fn resolve(rules: &RuleSet, target: &str, record: &LegacyRecord) -> Option<Value> {
        let options = MappingOptions::default();
        let mut report = MigrationReport::new();
        ValueResolver::new(rules, &options)
            .resolve(target, record, &mut report)
            .value
    }

    #[test]
    fn single_literal_wins_over_source() {
        let rules = rule_set(json!([
            {"folio_field": "active", "legacy_field": "status", "value": true}
        ]));
        let record = LegacyRecord::from_pairs([("status", "inactive")]);
        assert_eq!(resolve(&rules, "active", &record), Some(json!(true)));
    }

    #[test]
    fn multiple_sources_join_with_delimiter() {
        let rules = rule_set(json!([
            {"folio_field": "note", "legacy_field": "a"},
            {"folio_field": "note", "legacy_field": "b"},
            {"folio_field": "note", "legacy_field": "c"}
        ]));
        let record = LegacyRecord::from_pairs([("a", " one "), ("b", ""), ("c", "three")]);
        assert_eq!(resolve(&rules, "note", &record), Some(json!("one three")));
    }

    #[test]
    fn fallback_literal_used_when_sources_empty() {
        let rules = rule_set(json!([
            {"folio_field": "externalSystemId", "legacy_field": "ext_id",
             "fallback_legacy_field": "ext_id2", "fallback_value": "none"}
        ]));
        let record = LegacyRecord::from_pairs([("ext_id", ""), ("ext_id2", " ")]);
        assert_eq!(resolve(&rules, "externalSystemId", &record), Some(json!("none")));
    }

    #[test]
    fn missing_source_field_is_absent() {
        let rules = rule_set(json!([{"folio_field": "barcode", "legacy_field": "code"}]));
        let record = LegacyRecord::from_pairs([("other", "x")]);
        assert_eq!(resolve(&rules, "barcode", &record), None);
        assert_eq!(resolve(&rules, "unmapped", &record), None);
    }

    #[test]
    fn replacement_can_change_type() {
        let rules = rule_set(json!([
            {"folio_field": "active", "legacy_field": "flag",
             "rules": {"replaceValues": {"Y": true, "N": false}}}
        ]));
        let record = LegacyRecord::from_pairs([("flag", "N")]);
        assert_eq!(resolve(&rules, "active", &record), Some(json!(false)));
    }
}
