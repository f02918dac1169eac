use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid target path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("invalid schema at '{path}': {message}")]
    InvalidSchema { path: String, message: String },

    #[error("invalid mapping rule #{index} ({target}): {message}")]
    InvalidRule {
        index: usize,
        target: String,
        message: String,
    },

    #[error("invalid reference data table '{table}': {message}")]
    InvalidRefData { table: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
