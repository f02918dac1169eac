//! Well-known report sections and the descriptions printed under them.

pub const GENERAL_STATISTICS: &str = "General statistics";
pub const DEFAULT_VALUES: &str = "Default values added";
pub const UNKNOWN_CONDITIONS: &str = "Unknown conditions";
pub const UNMAPPED_TAGS: &str = "Unmapped tags";
pub const FIELD_ISSUES: &str = "Field issues";
pub const VALUE_SUBSTITUTIONS: &str = "Replaced values";

/// Suffix of per-table reference data sections (`"<table> mapping"`).
pub const REF_DATA_SUFFIX: &str = " mapping";

/// Labels used under [`GENERAL_STATISTICS`].
pub mod stats {
    pub const RECORDS_PROCESSED: &str = "Records processed";
    pub const RECORDS_TRANSFORMED: &str = "Records successfully transformed";
    pub const FAILED_DATA_ERROR: &str = "Records failed due to a data error";
    pub const FAILED_PROCESS_ERROR: &str = "Records failed due to a process error";
    pub const FAILED_UNCLASSIFIED: &str = "Records failed due to an unclassified error";
    pub const RECORDS_NOT_SUBMITTED: &str = "Records not submitted (run cancelled)";
}

pub const INTRODUCTION: &str = "Data errors that stop records from being migrated are marked \
**FIX BEFORE MIGRATION** and should be cleaned up in the source data. Sections marked \
**REVIEW** do not block the migration but may point to anomalies in the data or in the \
mapping files; check that the numbers match what you expect from the source.";

pub const TARGET_FIELDS_TITLE: &str = "Mapped target fields";
pub const TARGET_FIELDS_BLURB: &str = "Library action: **REVIEW**<br/>How many of the created \
records carry data in each target field. Compare the mapped totals with what the source data \
should produce.";

pub const LEGACY_FIELDS_TITLE: &str = "Mapped legacy fields";
pub const LEGACY_FIELDS_BLURB: &str = "Library action: **REVIEW**<br/>Every legacy field seen in \
the source data and how often it fed a target field. Fields with a high unmapped count may hold \
data worth adding to the mapping.";

/// Description printed under a section heading.
pub fn blurb(section: &str) -> &'static str {
    match section {
        GENERAL_STATISTICS => "Overall counts for the run.",
        DEFAULT_VALUES => {
            "Values set in the mapping file instead of coming from the legacy data."
        }
        UNKNOWN_CONDITIONS => {
            "Library action: **REVIEW**<br/>Condition names used in the rules that are not \
             recognized. The values passed through unchanged."
        }
        UNMAPPED_TAGS => {
            "Library action: **REVIEW**<br/>Repeatable fields present in the source data with \
             no field rule."
        }
        FIELD_ISSUES => {
            "Library action: **REVIEW**<br/>Problems found while mapping single fields. The \
             records were still migrated."
        }
        VALUE_SUBSTITUTIONS => "Legacy values replaced through a replaceValues table.",
        other if other.ends_with(REF_DATA_SUFFIX) => {
            "Library action: **REVIEW**<br/>Legacy values and the reference data they were \
             mapped to. Unmapped rows received the default value."
        }
        _ => "Section description to be added.",
    }
}

/// Section name for a reference data table.
pub fn ref_data_section(table: &str) -> String {
    format!("{table}{REF_DATA_SUFFIX}")
}
