//! Run-wide migration statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counters for one target field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFieldCounts {
    /// Records where the field had mapping rules and was attempted.
    pub present: u64,
    /// Attempts that resolved to nothing.
    pub empty: u64,
}

impl TargetFieldCounts {
    pub fn mapped(&self) -> u64 {
        self.present.saturating_sub(self.empty)
    }
}

/// Counters for one legacy source field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFieldCounts {
    /// Records containing the field.
    pub present: u64,
    /// Records where the field contributed to a mapped value.
    pub mapped: u64,
    /// Records where the field was present but blank.
    pub empty: u64,
}

impl LegacyFieldCounts {
    pub fn unmapped(&self) -> u64 {
        self.present.saturating_sub(self.mapped)
    }
}

/// Accumulator for everything the migration report shows.
///
/// Counters only grow. Workers keep their own report and the run merges
/// them, so no locking is involved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    sections: BTreeMap<String, BTreeMap<String, u64>>,
    target_fields: BTreeMap<String, TargetFieldCounts>,
    legacy_fields: BTreeMap<String, LegacyFieldCounts>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `label` under `section`.
    pub fn add(&mut self, section: &str, label: &str) {
        self.add_count(section, label, 1);
    }

    pub fn add_count(&mut self, section: &str, label: &str, count: u64) {
        *self.measure_mut(section, label) += count;
    }

    /// Overwrite a measure (totals computed at wrap-up).
    pub fn set(&mut self, section: &str, label: &str, count: u64) {
        *self.measure_mut(section, label) = count;
    }

    fn measure_mut(&mut self, section: &str, label: &str) -> &mut u64 {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default()
    }

    /// Record one attempt at a target field.
    pub fn report_target_field(&mut self, field: &str, present: bool, empty: bool) {
        let counts = self.target_fields.entry(field.to_string()).or_default();
        counts.present += u64::from(present);
        counts.empty += u64::from(empty);
    }

    /// Record that a legacy field occurred in a record.
    pub fn report_legacy_present(&mut self, field: &str, empty: bool) {
        let counts = self.legacy_fields.entry(field.to_string()).or_default();
        counts.present += 1;
        counts.empty += u64::from(empty);
    }

    /// Record that a legacy field fed a mapped value.
    pub fn report_legacy_mapped(&mut self, field: &str) {
        self.legacy_fields
            .entry(field.to_string())
            .or_default()
            .mapped += 1;
    }

    /// Add every counter of `other` into this report.
    pub fn merge(&mut self, other: Self) {
        for (section, measures) in other.sections {
            let target = self.sections.entry(section).or_default();
            for (label, count) in measures {
                *target.entry(label).or_default() += count;
            }
        }
        for (field, counts) in other.target_fields {
            let target = self.target_fields.entry(field).or_default();
            target.present += counts.present;
            target.empty += counts.empty;
        }
        for (field, counts) in other.legacy_fields {
            let target = self.legacy_fields.entry(field).or_default();
            target.present += counts.present;
            target.mapped += counts.mapped;
            target.empty += counts.empty;
        }
    }

    pub fn measure(&self, section: &str, label: &str) -> u64 {
        self.sections
            .get(section)
            .and_then(|measures| measures.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, u64>> {
        self.sections.get(section)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.sections
            .iter()
            .map(|(name, measures)| (name.as_str(), measures))
    }

    pub fn target_field(&self, field: &str) -> Option<TargetFieldCounts> {
        self.target_fields.get(field).copied()
    }

    pub fn target_fields(&self) -> &BTreeMap<String, TargetFieldCounts> {
        &self.target_fields
    }

    pub fn legacy_field(&self, field: &str) -> Option<LegacyFieldCounts> {
        self.legacy_fields.get(field).copied()
    }

    pub fn legacy_fields(&self) -> &BTreeMap<String, LegacyFieldCounts> {
        &self.legacy_fields
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.target_fields.is_empty() && self.legacy_fields.is_empty()
    }
}
