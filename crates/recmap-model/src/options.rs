//! Configuration options for record mapping.

use serde::{Deserialize, Serialize};

/// How unknown condition names in rules are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionMode {
    /// Fail loading the rule table.
    Strict,
    /// Warn, count in the report and pass the value through unchanged.
    #[default]
    Lenient,
}

/// Options controlling the mapping engine and run policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Number of slots tried for each array (`name[0]` .. `name[K-1]`).
    pub array_bound: usize,

    /// Separator used when several legacy fields map to one target.
    pub multi_field_delimiter: String,

    pub condition_mode: ConditionMode,

    /// Map arrays nested inside objects (`personal.addresses[0].city`).
    /// Off by default; such arrays are reported as unmapped.
    pub nested_arrays: bool,

    /// Property names never mapped.
    pub skip_properties: Vec<String>,

    /// Property name prefixes never mapped (computed fields).
    pub skip_prefixes: Vec<String>,

    /// Run halts once a failure class exceeds its threshold.
    pub max_critical_errors: u64,
    pub max_process_errors: u64,
    pub max_unclassified_errors: u64,

    /// Objects buffered before the output stage encodes and writes a batch.
    pub flush_batch_size: usize,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            array_bound: 9,
            multi_field_delimiter: " ".to_string(),
            condition_mode: ConditionMode::Lenient,
            nested_arrays: false,
            skip_properties: ["metadata", "id", "type", "lastCheckIn"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            skip_prefixes: vec!["effective".to_string()],
            max_critical_errors: 500,
            max_process_errors: 500,
            max_unclassified_errors: 500,
            flush_batch_size: 1000,
        }
    }
}

impl MappingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that reject unknown condition names at load time.
    pub fn strict() -> Self {
        Self {
            condition_mode: ConditionMode::Strict,
            ..Self::default()
        }
    }

    pub fn with_array_bound(mut self, bound: usize) -> Self {
        self.array_bound = bound;
        self
    }

    pub fn with_nested_arrays(mut self, enable: bool) -> Self {
        self.nested_arrays = enable;
        self
    }

    /// Whether a schema property is excluded from mapping by name.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_properties.iter().any(|skip| skip == name)
            || self
                .skip_prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }
}
