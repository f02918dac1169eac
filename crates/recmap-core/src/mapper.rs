//! Record-level API: one legacy record in, one validated target object out.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, debug_span};

use recmap_map::{
    FieldIssue, FieldRuleMapper, FieldRulesFile, MapError, RefDataBindings, RuleSet, SchemaWalker,
};
use recmap_model::{
    LegacyRecord, MappingOptions, RefDataTable, RuleTable, TargetSchema, strip_indices,
};
use recmap_report::MigrationReport;
use recmap_validate::{ValidationError, Validator};

use crate::error::{RecordError, Result};

/// A successfully mapped record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub id: String,
    pub object: Map<String, Value>,
}

/// Everything needed to map records of one kind, loaded once per run.
///
/// Read-only after construction, so one mapper is shared by every worker.
#[derive(Debug)]
pub struct RecordMapper {
    schema: TargetSchema,
    rules: RuleSet,
    ref_data: RefDataBindings,
    field_rules: FieldRuleMapper,
    validator: Validator,
    options: MappingOptions,
}

impl RecordMapper {
    pub fn new(schema: TargetSchema, rules: RuleTable, options: MappingOptions) -> Result<Self> {
        let rules = RuleSet::new(rules, &options)?;
        let validator = Validator::new(&schema)?;
        Ok(Self {
            schema,
            rules,
            ref_data: RefDataBindings::new(),
            field_rules: FieldRuleMapper::default(),
            validator,
            options,
        })
    }

    /// Bind a reference data table to a target leaf.
    ///
    /// The target must be a leaf of the schema; slot indices are ignored.
    pub fn with_ref_data(
        mut self,
        target: &str,
        table: RefDataTable,
        prevent_default: bool,
    ) -> Result<Self> {
        let wanted = strip_indices(target);
        let known = self
            .schema
            .leaves()
            .iter()
            .any(|leaf| leaf.path.replace("[]", "") == wanted);
        if !known {
            return Err(MapError::UnboundRefData {
                table: table.name,
                target: target.to_string(),
            }
            .into());
        }
        self.ref_data.bind(target, table, prevent_default);
        Ok(self)
    }

    pub fn with_field_rules(mut self, file: FieldRulesFile) -> Result<Self> {
        self.field_rules = FieldRuleMapper::new(file, &self.schema, &self.options)?;
        Ok(self)
    }

    pub fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    fn walker(&self) -> SchemaWalker<'_> {
        SchemaWalker::new(&self.schema, &self.rules, &self.ref_data, &self.options)
    }

    /// Schema shapes the walker never maps.
    pub fn unsupported_shapes(&self) -> Vec<FieldIssue> {
        self.walker().unsupported_shapes()
    }

    /// Map one record: walk the schema, apply field rules, validate.
    ///
    /// Field statistics go to `report` whether or not the record fails.
    pub fn map_one(
        &self,
        record: &LegacyRecord,
        record_id: &str,
        report: &mut MigrationReport,
    ) -> std::result::Result<MappedRecord, RecordError> {
        let _span = debug_span!("map_record", record = record_id).entered();
        for (field, _) in record.fields() {
            let empty = record.text(field).is_none_or(|text| text.is_empty());
            report.report_legacy_present(field, empty);
        }

        let mut used = BTreeSet::new();
        let mut object = self
            .walker()
            .map_with_used(record, report, &mut used)
            .map_err(|err| RecordError::Critical {
                record_id: record_id.to_string(),
                message: err.message,
            })?;
        if !self.field_rules.is_empty() {
            self.field_rules
                .apply_with_used(record, &mut object, report, &mut used);
        }
        // A field feeding both the walk and a field rule counts once.
        for field in &used {
            report.report_legacy_mapped(field);
        }

        self.validator
            .validate(&mut object, record_id)
            .map_err(|err| match err {
                ValidationError::MissingRequired { paths, .. } => RecordError::Critical {
                    record_id: record_id.to_string(),
                    message: format!("required field(s) missing or empty: {}", paths.join(", ")),
                },
                other => RecordError::Unclassified {
                    record_id: record_id.to_string(),
                    message: other.to_string(),
                },
            })?;
        debug!(fields = object.len(), "record mapped");
        Ok(MappedRecord {
            id: record_id.to_string(),
            object,
        })
    }
}
