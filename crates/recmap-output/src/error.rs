use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("create {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode object {index} of batch")]
    Encode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write output")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
