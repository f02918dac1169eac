//! Named string conditions applied to legacy values.
//!
//! Conditions run left to right; each sees the output of the previous one.

use recmap_model::ConditionMode;
use recmap_report::MigrationReport;
use recmap_report::sections::UNKNOWN_CONDITIONS;
use tracing::warn;

use crate::error::{MapError, Result};

/// Trailing characters removed by `remove_ending_punc`.
pub const ENDING_PUNCTUATION: &[char] = &['.', ';', ':', ',', '/', '+', '=', '-', ' '];

/// At most this many trailing separators are removed after an indicator prefix.
const PREFIX_TAIL_LIMIT: usize = 3;

/// One named transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Trim,
    TrimPeriod,
    RemoveEndingPunc,
    RemovePrefixByIndicator,
    /// Kept in lenient mode; passes values through and is counted.
    Unknown(String),
}

impl Condition {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "trim" => Self::Trim,
            "trim_period" => Self::TrimPeriod,
            "remove_ending_punc" => Self::RemoveEndingPunc,
            "remove_prefix_by_indicator" => Self::RemovePrefixByIndicator,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Trim => "trim",
            Self::TrimPeriod => "trim_period",
            Self::RemoveEndingPunc => "remove_ending_punc",
            Self::RemovePrefixByIndicator => "remove_prefix_by_indicator",
            Self::Unknown(name) => name,
        }
    }

    fn apply(&self, value: &str, indicator2: Option<u32>) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::TrimPeriod => trim_period(value),
            Self::RemoveEndingPunc => remove_ending_punc(value).to_string(),
            Self::RemovePrefixByIndicator => remove_prefix_by_indicator(value, indicator2),
            Self::Unknown(_) => value.to_string(),
        }
    }
}

/// Ordered list of conditions compiled from rule text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionPipeline {
    steps: Vec<Condition>,
}

impl ConditionPipeline {
    /// Compile condition names for the rule targeting `target`.
    ///
    /// Unknown names fail in [`ConditionMode::Strict`] and are kept as
    /// pass-through steps otherwise.
    pub fn parse<S: AsRef<str>>(names: &[S], mode: ConditionMode, target: &str) -> Result<Self> {
        let mut steps = Vec::with_capacity(names.len());
        for name in names {
            let condition = Condition::from_name(name.as_ref());
            if let Condition::Unknown(unknown) = &condition {
                match mode {
                    ConditionMode::Strict => {
                        return Err(MapError::UnknownCondition {
                            name: unknown.clone(),
                            target: target.to_string(),
                        });
                    }
                    ConditionMode::Lenient => {
                        warn!(condition = %unknown, field = target, "unknown condition, values pass through");
                    }
                }
            }
            steps.push(condition);
        }
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Condition] {
        &self.steps
    }

    /// Run every step over `value`. Unknown steps are counted in the report.
    pub fn apply(
        &self,
        value: &str,
        indicator2: Option<u32>,
        report: &mut MigrationReport,
    ) -> String {
        let mut current = value.to_string();
        for step in &self.steps {
            if let Condition::Unknown(name) = step {
                report.add(UNKNOWN_CONDITIONS, name);
            }
            current = step.apply(&current, indicator2);
        }
        current
    }
}

/// Trim, then drop one trailing `.` and then one trailing `,`.
pub fn trim_period(value: &str) -> String {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    trimmed.to_string()
}

/// Strip every trailing character in [`ENDING_PUNCTUATION`].
pub fn remove_ending_punc(value: &str) -> &str {
    value.trim_end_matches(ENDING_PUNCTUATION)
}

/// Drop the non-filing prefix counted by indicator 2 (`1`..=`9`), then up
/// to three trailing whitespace, `:` or `/` characters.
pub fn remove_prefix_by_indicator(value: &str, indicator2: Option<u32>) -> String {
    let skip = match indicator2 {
        Some(count @ 1..=9) => count as usize,
        _ => 0,
    };
    let rest: String = value.chars().skip(skip).collect();
    let tail = rest
        .chars()
        .rev()
        .take_while(|ch| ch.is_whitespace() || *ch == ':' || *ch == '/')
        .take(PREFIX_TAIL_LIMIT)
        .count();
    let keep = rest.chars().count() - tail;
    rest.chars().take(keep).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(names: &[&str]) -> ConditionPipeline {
        ConditionPipeline::parse(names, ConditionMode::Lenient, "title").unwrap()
    }

    #[test]
    fn trim_period_strips_one_of_each() {
        assert_eq!(trim_period("  Smith, John.  "), "Smith, John");
        assert_eq!(trim_period("Smith,"), "Smith");
        assert_eq!(trim_period("etc.."), "etc.");
        assert_eq!(trim_period("a.,"), "a.");
    }

    #[test]
    fn ending_punctuation_is_removed_repeatedly() {
        assert_eq!(remove_ending_punc("The title : /"), "The title");
        assert_eq!(remove_ending_punc("1999.-"), "1999");
        assert_eq!(remove_ending_punc("...."), "");
        assert_eq!(remove_ending_punc("plain"), "plain");
    }

    #[test]
    fn indicator_prefix_is_dropped() {
        assert_eq!(remove_prefix_by_indicator("The cat :", Some(4)), "cat");
        assert_eq!(remove_prefix_by_indicator("A dog / ", Some(2)), "dog");
        assert_eq!(remove_prefix_by_indicator("Title ::::", Some(0)), "Title :");
        assert_eq!(remove_prefix_by_indicator("Title", None), "Title");
    }

    #[test]
    fn pipeline_runs_left_to_right() {
        let mut report = MigrationReport::new();
        let steps = pipeline(&["trim", "remove_ending_punc"]);
        assert_eq!(steps.apply("  Title /  ", None, &mut report), "Title");
        assert!(report.is_empty());
    }

    #[test]
    fn unknown_conditions_pass_through_and_are_counted() {
        let mut report = MigrationReport::new();
        let steps = pipeline(&["capitalize", "trim"]);
        assert_eq!(steps.apply(" value ", None, &mut report), "value");
        assert_eq!(report.measure(UNKNOWN_CONDITIONS, "capitalize"), 1);
    }

    #[test]
    fn strict_mode_rejects_unknown_conditions() {
        let err = ConditionPipeline::parse(&["capitalize"], ConditionMode::Strict, "title")
            .unwrap_err();
        assert!(matches!(err, MapError::UnknownCondition { name, .. } if name == "capitalize"));
    }
}
