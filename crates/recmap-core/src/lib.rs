//! Record mapping pipeline.
//!
//! [`RecordMapper`] maps one record at a time (schema walk, field rules,
//! validation). [`MigrationRun`] drives many records through it, sequentially
//! or on the rayon pool, and turns failures into report counts.

mod error;
mod mapper;
mod run;

pub use error::{ErrorKind, RecordError, Result, RunError, SetupError};
pub use mapper::{MappedRecord, RecordMapper};
pub use run::{
    BatchOutput, CancelHandle, FailedRecord, MigrationRun, RunCounts, RunSummary, Schedule,
    SourceRecord,
};
