//! Error types for loading inputs.

use std::path::PathBuf;

use recmap_model::ModelError;
use thiserror::Error;

/// Errors raised while reading configuration, mapping files and records.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse delimited file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid content in {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    /// One input row that could not be turned into a record.
    #[error("row {row}: {message}")]
    MalformedRow { row: u64, message: String },

    #[error("cannot infer input format of {path}; pass --format")]
    UnknownFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_display() {
        let err = IngestError::MalformedRow {
            row: 12,
            message: "found 2 fields, expected 3".to_string(),
        };
        assert_eq!(err.to_string(), "row 12: found 2 fields, expected 3");
    }
}
