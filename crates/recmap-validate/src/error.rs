use recmap_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more required fields were absent or blank after mapping.
    #[error("required field(s) missing or empty in record {record_id}: {}", .paths.join(", "))]
    MissingRequired { record_id: String, paths: Vec<String> },

    #[error("invalid required path '{path}'")]
    InvalidRequiredPath {
        path: String,
        #[source]
        source: ModelError,
    },
}

pub type Result<T> = std::result::Result<T, ValidationError>;
