//! Error types for the mapping engine.

use recmap_model::ModelError;
use recmap_report::MigrationReport;
use recmap_report::sections::FIELD_ISSUES;
use thiserror::Error;
use tracing::warn;

/// Load-time failures while compiling rules and tables.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("unknown condition '{name}' in rule for {target}")]
    UnknownCondition { name: String, target: String },

    #[error("invalid regex for {target}: {pattern}")]
    InvalidRegex {
        target: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid field rule for tag {tag}: {message}")]
    InvalidFieldRule { tag: String, message: String },

    #[error("reference data table '{table}' is bound to unknown target {target}")]
    UnboundRefData { table: String, target: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, MapError>;

/// Recoverable problem: logged and counted, mapping goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIssue {
    #[error("schema shape {kind} at {path} is not mapped")]
    UnsupportedShape { path: String, kind: String },

    #[error("{target} is not {expected} in the object")]
    ShapeConflict {
        target: String,
        expected: &'static str,
    },
}

impl FieldIssue {
    /// Log the issue and count it under the field issues section.
    pub fn report(&self, report: &mut MigrationReport) {
        warn!(issue = %self, "field issue");
        report.add(FIELD_ISSUES, &self.to_string());
    }
}

/// Data problem that aborts the current record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CriticalDataError {
    pub message: String,
}

impl CriticalDataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
