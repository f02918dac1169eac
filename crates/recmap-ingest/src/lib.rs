//! Input side of a migration run: configuration, mapping files, reference
//! data tables and legacy record files.

mod config;
mod error;
mod files;
mod records;

pub use config::{RefDataConfig, RunConfig};
pub use error::{IngestError, Result};
pub use files::{delimiter_for, load_ref_data, load_rule_table, load_schema, read_json};
pub use records::{InputFormat, RecordReader, RecordRow, parse_marc_json};
