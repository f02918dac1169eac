//! Rule table compiled for mapping: condition pipelines and regexes are
//! built once at load time.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::Value;

use recmap_model::{MappingOptions, MappingRule, RuleTable};

use crate::conditions::ConditionPipeline;
use crate::error::{MapError, Result};

/// A mapping rule with its transforms ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: MappingRule,
    pub conditions: ConditionPipeline,
    pub regex: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: MappingRule, options: &MappingOptions) -> Result<Self> {
        let conditions = ConditionPipeline::parse(
            rule.rules.conditions.as_slice(),
            options.condition_mode,
            &rule.target,
        )?;
        let regex = match rule.rules.regex_get_first_match_or_empty.as_deref() {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| MapError::InvalidRegex {
                target: rule.target.clone(),
                pattern: pattern.to_string(),
                source,
            })?),
            None => None,
        };
        Ok(Self {
            rule,
            conditions,
            regex,
        })
    }

    /// `regexGetFirstMatchOrEmpty`: first capture group of the first match,
    /// the whole match for group-less patterns, `""` when nothing matches.
    pub fn extract(&self, value: &str) -> String {
        let Some(regex) = &self.regex else {
            return value.to_string();
        };
        let group = usize::from(regex.captures_len() > 1);
        regex
            .captures(value)
            .and_then(|captures| captures.get(group))
            .map_or_else(String::new, |m| m.as_str().to_string())
    }

    /// `replaceValues`: exact-match substitution.
    pub fn replacement(&self, value: &str) -> Option<&Value> {
        self.rule.rules.replace_values.get(value)
    }
}

/// Active rules grouped by target path.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    table: RuleTable,
    by_target: BTreeMap<String, Vec<CompiledRule>>,
}

impl RuleSet {
    pub fn new(table: RuleTable, options: &MappingOptions) -> Result<Self> {
        let mut by_target: BTreeMap<String, Vec<CompiledRule>> = BTreeMap::new();
        for target in table.mapped_targets() {
            let compiled = table
                .rules_for(target)
                .map(|rule| CompiledRule::compile(rule.clone(), options))
                .collect::<Result<Vec<_>>>()?;
            by_target.insert(target.to_string(), compiled);
        }
        Ok(Self { table, by_target })
    }

    pub fn rules_for(&self, target: &str) -> &[CompiledRule] {
        self.by_target.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_mapped(&self, target: &str) -> bool {
        self.by_target.contains_key(target)
    }

    pub fn has_mapped_under(&self, prefix: &str) -> bool {
        self.table.has_mapped_under(prefix)
    }

    pub fn legacy_fields(&self) -> &BTreeSet<String> {
        self.table.legacy_fields()
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap_model::ConditionMode;
    use serde_json::json;

    fn compiled(value: Value) -> Result<CompiledRule> {
        let rule: MappingRule = serde_json::from_value(value).unwrap();
        CompiledRule::compile(rule, &MappingOptions::default())
    }

    #[test]
    fn regex_returns_first_group_or_empty() {
        let rule = compiled(json!({
            "folio_field": "personal.firstName",
            "legacy_field": "name",
            "rules": {"regexGetFirstMatchOrEmpty": ".*, (\\S+)"}
        }))
        .unwrap();
        assert_eq!(rule.extract("Graney, Carol Homan"), "Carol");
        assert_eq!(rule.extract("Graney"), "");
    }

    #[test]
    fn regex_without_groups_returns_whole_match() {
        let rule = compiled(json!({
            "folio_field": "barcode",
            "legacy_field": "code",
            "rules": {"regexGetFirstMatchOrEmpty": "\\d+"}
        }))
        .unwrap();
        assert_eq!(rule.extract("abc 123 def"), "123");
    }

    #[test]
    fn invalid_regex_fails_to_compile() {
        let err = compiled(json!({
            "folio_field": "barcode",
            "legacy_field": "code",
            "rules": {"regexGetFirstMatchOrEmpty": "(unclosed"}
        }))
        .unwrap_err();
        assert!(matches!(err, MapError::InvalidRegex { .. }));
    }

    #[test]
    fn strict_mode_fails_rule_set_on_unknown_condition() {
        let rule: MappingRule = serde_json::from_value(json!({
            "folio_field": "barcode",
            "legacy_field": "code",
            "rules": {"conditions": "trim, shout"}
        }))
        .unwrap();
        let table = RuleTable::from_rules(vec![rule]).unwrap();
        let options = MappingOptions {
            condition_mode: ConditionMode::Strict,
            ..MappingOptions::default()
        };
        assert!(RuleSet::new(table.clone(), &options).is_err());
        assert!(RuleSet::new(table, &MappingOptions::default()).is_ok());
    }
}
