use serde::{Deserialize, Serialize};
use thiserror::Error;

use recmap_map::MapError;
use recmap_validate::ValidationError;

/// Why a single record was not migrated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Bad legacy data: missing required field, unresolvable reference data.
    #[error("critical data error in record {record_id}: {message}")]
    Critical { record_id: String, message: String },

    /// A collaborator failed, e.g. the input row could not be read.
    #[error("process error in record {record_id}: {message}")]
    Process { record_id: String, message: String },

    /// Anything else, including a panic while mapping.
    #[error("unclassified error in record {record_id}: {message}")]
    Unclassified { record_id: String, message: String },
}

/// Failure category, as written to the failed-records file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Critical,
    Process,
    Unclassified,
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Critical { .. } => ErrorKind::Critical,
            Self::Process { .. } => ErrorKind::Process,
            Self::Unclassified { .. } => ErrorKind::Unclassified,
        }
    }

    pub fn record_id(&self) -> &str {
        match self {
            Self::Critical { record_id, .. }
            | Self::Process { record_id, .. }
            | Self::Unclassified { record_id, .. } => record_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Critical { message, .. }
            | Self::Process { message, .. }
            | Self::Unclassified { message, .. } => message,
        }
    }
}

/// Error thresholds that stop a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("too many critical data errors ({count} > {limit}), run halted")]
    TooManyCriticalErrors { count: u64, limit: u64 },

    #[error("too many process errors ({count} > {limit}), run halted")]
    TooManyProcessErrors { count: u64, limit: u64 },

    #[error("too many unclassified errors ({count} > {limit}), run halted")]
    TooManyUnclassifiedErrors { count: u64, limit: u64 },
}

/// Failures while assembling a [`RecordMapper`](crate::RecordMapper).
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, SetupError>;
