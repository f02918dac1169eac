//! Output stage: JSON-lines objects, failed records and the report file.

mod error;
mod files;
mod jsonl;

pub use error::{OutputError, Result};
pub use files::{
    OutputPaths, REPORT_FILE_NAME, create_writer, ensure_output_dir, write_report_file,
};
pub use jsonl::{BatchSerializer, encode_batch};
