//! Recursive descent over the target schema.
//!
//! One handler per [`NodeKind`]. Leaves go through the [`ValueResolver`] or,
//! when a reference data table is bound to the path, the table lookup.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

use recmap_model::{
    LegacyRecord, MappingOptions, NodeKind, PropertySchema, TargetSchema, child_path,
    is_empty_value,
};
use recmap_report::MigrationReport;

use crate::builder::ObjectBuilder;
use crate::error::{CriticalDataError, FieldIssue};
use crate::ref_data::{RefDataBindings, RefDataOutcome};
use crate::resolver::ValueResolver;
use crate::rules::RuleSet;

/// Where a property sits, which decides the shapes that are mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Top-level property.
    Root,
    /// Property of a top-level object.
    Object,
    /// Property of one array slot (`name[i].prop`).
    Slot,
}

/// Per-record walk state.
struct Walk<'r> {
    record: &'r LegacyRecord,
    report: &'r mut MigrationReport,
    used_legacy: &'r mut BTreeSet<String>,
    /// Set when a mapped slot leaf resolved empty.
    slot_hole: bool,
}

/// Builds target objects from legacy records by walking the schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaWalker<'a> {
    schema: &'a TargetSchema,
    rules: &'a RuleSet,
    ref_data: &'a RefDataBindings,
    options: &'a MappingOptions,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(
        schema: &'a TargetSchema,
        rules: &'a RuleSet,
        ref_data: &'a RefDataBindings,
        options: &'a MappingOptions,
    ) -> Self {
        Self {
            schema,
            rules,
            ref_data,
            options,
        }
    }

    /// Schema shapes that will never be mapped, for one-time reporting.
    pub fn unsupported_shapes(&self) -> Vec<FieldIssue> {
        fn scan(
            properties: &BTreeMap<String, PropertySchema>,
            parent: &str,
            out: &mut Vec<FieldIssue>,
        ) {
            for (name, prop) in properties {
                let path = child_path(parent, name);
                match &prop.kind {
                    NodeKind::Object { properties } => scan(properties, &path, out),
                    NodeKind::ObjectArray { properties } => {
                        scan(properties, &format!("{path}[]"), out);
                    }
                    NodeKind::Unsupported { .. } => out.push(FieldIssue::UnsupportedShape {
                        path,
                        kind: prop.kind.label(),
                    }),
                    NodeKind::StringArray | NodeKind::Scalar { .. } => {}
                }
            }
        }
        let mut issues = Vec::new();
        scan(&self.schema.properties, "", &mut issues);
        issues
    }

    /// Map one record. Unmapped leaves are reported; only reference data
    /// errors abort the record.
    pub fn map(
        &self,
        record: &LegacyRecord,
        report: &mut MigrationReport,
    ) -> Result<Map<String, Value>, CriticalDataError> {
        let mut used = BTreeSet::new();
        let object = self.map_with_used(record, report, &mut used)?;
        for field in &used {
            report.report_legacy_mapped(field);
        }
        Ok(object)
    }

    /// Like [`map`](Self::map), but legacy fields that fed the object are
    /// added to `used` instead of being counted.
    pub fn map_with_used(
        &self,
        record: &LegacyRecord,
        report: &mut MigrationReport,
        used: &mut BTreeSet<String>,
    ) -> Result<Map<String, Value>, CriticalDataError> {
        let mut walk = Walk {
            record,
            report,
            used_legacy: used,
            slot_hole: false,
        };
        let mut root = ObjectBuilder::new();
        for (name, prop) in &self.schema.properties {
            self.visit(name, prop, "", Scope::Root, &mut root, &mut walk)?;
        }
        Ok(root.into_map())
    }

    fn visit(
        &self,
        name: &str,
        prop: &PropertySchema,
        parent: &str,
        scope: Scope,
        out: &mut ObjectBuilder,
        walk: &mut Walk<'_>,
    ) -> Result<(), CriticalDataError> {
        let path = child_path(parent, name);
        if prop.deprecated {
            if scope != Scope::Slot {
                walk.report
                    .report_target_field(&format!("{path} (deprecated)"), false, false);
            }
            return Ok(());
        }
        if prop.is_virtual || (scope == Scope::Root && self.options.is_skipped(name)) {
            if scope != Scope::Slot {
                walk.report
                    .report_target_field(&format!("{path} (skipped)"), false, false);
            }
            return Ok(());
        }

        match (&prop.kind, scope) {
            (NodeKind::Scalar { .. }, Scope::Slot) => match self.leaf(&path, walk)? {
                Some(value) => out.set(name, value),
                None if self.rules.is_mapped(&path) => walk.slot_hole = true,
                None => {}
            },
            (NodeKind::Scalar { .. }, _) => {
                if !self.rules.is_mapped(&path) {
                    walk.report.report_target_field(&path, false, false);
                } else if let Some(value) = self.leaf(&path, walk)? {
                    out.set(name, value);
                }
            }
            (NodeKind::Object { properties }, Scope::Root) => {
                let mut child = ObjectBuilder::new();
                for (sub_name, sub_prop) in properties {
                    self.visit(sub_name, sub_prop, &path, Scope::Object, &mut child, walk)?;
                }
                child.commit_into(out, name);
            }
            (NodeKind::Object { properties }, Scope::Object) => {
                for (sub_name, sub_prop) in properties {
                    walk.report.report_target_field(
                        &format!("{path}.{sub_name} (Unmapped {})", sub_prop.kind.label()),
                        false,
                        false,
                    );
                }
            }
            (NodeKind::ObjectArray { properties }, Scope::Root) => {
                self.object_array(name, properties, &path, out, walk)?;
            }
            (NodeKind::StringArray, Scope::Root) => {
                self.string_array(name, &path, out, walk)?;
            }
            (NodeKind::ObjectArray { properties }, Scope::Object) if self.options.nested_arrays => {
                self.object_array(name, properties, &path, out, walk)?;
            }
            (NodeKind::StringArray, Scope::Object) if self.options.nested_arrays => {
                self.string_array(name, &path, out, walk)?;
            }
            (NodeKind::Unsupported { type_name, in_array: true }, _) => {
                walk.report.report_target_field(
                    &format!("Unhandled array of {type_name}: {path}"),
                    false,
                    false,
                );
            }
            (kind, Scope::Slot) => {
                if self.rules.is_mapped(&path) || self.rules.has_mapped_under(&path) {
                    walk.report.report_target_field(
                        &format!("{path} (Unmapped {})", kind.label()),
                        false,
                        false,
                    );
                }
            }
            (kind, _) => {
                walk.report.report_target_field(
                    &format!("{path} (Unmapped {})", kind.label()),
                    false,
                    false,
                );
            }
        }
        Ok(())
    }

    /// Slots `0..array_bound`; a slot is kept only when every mapped
    /// property resolved to a non-empty value or a boolean.
    fn object_array(
        &self,
        name: &str,
        properties: &BTreeMap<String, PropertySchema>,
        path: &str,
        out: &mut ObjectBuilder,
        walk: &mut Walk<'_>,
    ) -> Result<(), CriticalDataError> {
        let mut items = Vec::new();
        let mut any_mapped = false;
        for index in 0..self.options.array_bound {
            let slot_path = format!("{path}[{index}]");
            if !self.rules.has_mapped_under(&slot_path) {
                continue;
            }
            any_mapped = true;
            let mut slot = ObjectBuilder::new();
            walk.slot_hole = false;
            for (sub_name, sub_prop) in properties {
                self.visit(sub_name, sub_prop, &slot_path, Scope::Slot, &mut slot, walk)?;
            }
            if slot.is_empty() || walk.slot_hole {
                debug!(slot = %slot_path, "discarding incomplete array slot");
            } else {
                items.push(Value::Object(slot.into_map()));
            }
        }
        if !any_mapped {
            walk.report.report_target_field(path, false, false);
        }
        if !items.is_empty() {
            out.set(name, Value::Array(items));
        }
        Ok(())
    }

    /// Slots `0..array_bound`; distinct non-empty values in slot order.
    fn string_array(
        &self,
        name: &str,
        path: &str,
        out: &mut ObjectBuilder,
        walk: &mut Walk<'_>,
    ) -> Result<(), CriticalDataError> {
        let mut any_mapped = false;
        for index in 0..self.options.array_bound {
            let slot_path = format!("{path}[{index}]");
            if !self.rules.is_mapped(&slot_path) {
                continue;
            }
            any_mapped = true;
            if let Some(value) = self.leaf(&slot_path, walk)? {
                out.push_unique(name, value);
            }
        }
        if !any_mapped {
            walk.report.report_target_field(path, false, false);
        }
        Ok(())
    }

    /// Resolve one mapped leaf; `None` when it came out empty.
    fn leaf(&self, path: &str, walk: &mut Walk<'_>) -> Result<Option<Value>, CriticalDataError> {
        if !self.rules.is_mapped(path) {
            return Ok(None);
        }
        let literal_only = matches!(
            self.rules.rules_for(path),
            [only] if only.rule.literal().is_some()
        );
        let (value, used) = match self.ref_data.for_path(path) {
            Some(binding) if !literal_only => {
                let outcome =
                    binding
                        .resolver
                        .lookup(walk.record, binding.prevent_default, walk.report)?;
                let used = match outcome {
                    RefDataOutcome::Matched { .. } => binding.resolver.table().key_columns.clone(),
                    _ => Vec::new(),
                };
                (Some(Value::String(outcome.id().to_string())), used)
            }
            _ => {
                let resolution = ValueResolver::new(self.rules, self.options).resolve(
                    path,
                    walk.record,
                    walk.report,
                );
                (resolution.value, resolution.used_fields)
            }
        };
        let empty = value.as_ref().is_none_or(is_empty_value);
        walk.report.report_target_field(path, true, empty);
        if empty {
            debug!(target_field = path, "mapped leaf resolved empty");
            return Ok(None);
        }
        walk.used_legacy.extend(used);
        Ok(value)
    }
}
