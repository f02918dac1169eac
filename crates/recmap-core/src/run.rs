//! Migration run: feeds records through a [`RecordMapper`], classifies
//! failures, enforces error thresholds and owns the run report.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use recmap_model::{LegacyRecord, MappingOptions};
use recmap_report::MigrationReport;
use recmap_report::sections::{GENERAL_STATISTICS, stats};

use crate::error::{ErrorKind, RecordError, RunError};
use crate::mapper::{MappedRecord, RecordMapper};

/// One unit of input: a parsed record, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub data: Result<LegacyRecord, String>,
}

impl SourceRecord {
    pub fn new(id: impl Into<String>, record: LegacyRecord) -> Self {
        Self {
            id: id.into(),
            data: Ok(record),
        }
    }

    /// An input row that failed to parse.
    pub fn malformed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Err(message.into()),
        }
    }
}

/// A record that was not migrated, as written to the failed-records file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecord {
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
    /// The legacy record, when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<LegacyRecord>,
}

/// Records of one batch, in submission order.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub mapped: Vec<MappedRecord>,
    pub failed: Vec<FailedRecord>,
    /// Records skipped because the run was cancelled or halted.
    pub not_submitted: u64,
}

/// Running totals behind the "General statistics" section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub processed: u64,
    pub transformed: u64,
    pub critical: u64,
    pub process: u64,
    pub unclassified: u64,
    pub not_submitted: u64,
}

impl RunCounts {
    pub fn failed(&self) -> u64 {
        self.critical + self.process + self.unclassified
    }
}

/// End-of-run result.
#[derive(Debug)]
pub struct RunSummary {
    pub report: MigrationReport,
    pub counts: RunCounts,
    /// Set when an error threshold stopped the run.
    pub halted: Option<RunError>,
    pub cancelled: bool,
}

/// How records of a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schedule {
    #[default]
    Sequential,
    /// Fan out over the rayon pool; results keep submission order.
    Parallel,
}

/// Handle that stops a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A migration in progress.
///
/// Records are submitted in batches; the report and counters live here and
/// are only touched on the calling thread.
#[derive(Debug)]
pub struct MigrationRun<'m> {
    mapper: &'m RecordMapper,
    schedule: Schedule,
    report: MigrationReport,
    counts: RunCounts,
    halted: Option<RunError>,
    cancel: CancelHandle,
}

impl<'m> MigrationRun<'m> {
    pub fn new(mapper: &'m RecordMapper) -> Self {
        let mut report = MigrationReport::new();
        for issue in mapper.unsupported_shapes() {
            issue.report(&mut report);
        }
        Self {
            mapper,
            schedule: Schedule::default(),
            report,
            counts: RunCounts::default(),
            halted: None,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    pub fn halted(&self) -> Option<&RunError> {
        self.halted.as_ref()
    }

    /// Whether new records are still accepted.
    pub fn is_open(&self) -> bool {
        self.halted.is_none() && !self.cancel.is_cancelled()
    }

    /// Map one batch. Once the run is halted or cancelled, remaining records
    /// are counted as not submitted.
    pub fn process_batch(&mut self, batch: Vec<SourceRecord>) -> BatchOutput {
        let _span = info_span!("batch", size = batch.len()).entered();
        match self.schedule {
            Schedule::Sequential => self.process_sequential(batch),
            Schedule::Parallel => self.process_parallel(batch),
        }
    }

    fn process_sequential(&mut self, batch: Vec<SourceRecord>) -> BatchOutput {
        let mut output = BatchOutput::default();
        for source in batch {
            if !self.is_open() {
                output.not_submitted += 1;
                continue;
            }
            let result = map_source(self.mapper, &source, &mut self.report);
            self.record_outcome(source, result, &mut output);
            self.check_thresholds();
        }
        self.counts.not_submitted += output.not_submitted;
        output
    }

    fn process_parallel(&mut self, batch: Vec<SourceRecord>) -> BatchOutput {
        let mut output = BatchOutput::default();
        if !self.is_open() {
            output.not_submitted = batch.len() as u64;
            self.counts.not_submitted += output.not_submitted;
            return output;
        }
        let mapper = self.mapper;
        let cancel = &self.cancel;
        let results: Vec<_> = batch
            .par_iter()
            .map(|source| {
                if cancel.is_cancelled() {
                    return None;
                }
                let mut local = MigrationReport::new();
                let result = map_source(mapper, source, &mut local);
                Some((result, local))
            })
            .collect();

        for (source, result) in batch.into_iter().zip(results) {
            match result {
                Some((result, local)) => {
                    self.report.merge(local);
                    self.record_outcome(source, result, &mut output);
                }
                None => output.not_submitted += 1,
            }
        }
        self.counts.not_submitted += output.not_submitted;
        self.check_thresholds();
        output
    }

    fn record_outcome(
        &mut self,
        source: SourceRecord,
        result: Result<MappedRecord, RecordError>,
        output: &mut BatchOutput,
    ) {
        self.counts.processed += 1;
        match result {
            Ok(mapped) => {
                self.counts.transformed += 1;
                output.mapped.push(mapped);
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Critical => self.counts.critical += 1,
                    ErrorKind::Process => self.counts.process += 1,
                    ErrorKind::Unclassified => self.counts.unclassified += 1,
                }
                error!(record = err.record_id(), kind = ?err.kind(), "{}", err.message());
                output.failed.push(FailedRecord {
                    id: source.id,
                    kind: err.kind(),
                    message: err.message().to_string(),
                    record: source.data.ok(),
                });
            }
        }
    }

    fn check_thresholds(&mut self) {
        if self.halted.is_some() {
            return;
        }
        let options = self.mapper.options();
        self.halted = threshold_error(&self.counts, options);
        if let Some(err) = &self.halted {
            error!(error = %err, "stopping migration");
        }
    }

    /// Fill in the general statistics and hand back the report.
    pub fn wrap_up(mut self) -> RunSummary {
        let counts = self.counts;
        let measures = [
            (stats::RECORDS_PROCESSED, counts.processed),
            (stats::RECORDS_TRANSFORMED, counts.transformed),
            (stats::FAILED_DATA_ERROR, counts.critical),
            (stats::FAILED_PROCESS_ERROR, counts.process),
            (stats::FAILED_UNCLASSIFIED, counts.unclassified),
            (stats::RECORDS_NOT_SUBMITTED, counts.not_submitted),
        ];
        for (label, count) in measures {
            self.report.set(GENERAL_STATISTICS, label, count);
        }
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(not_submitted = counts.not_submitted, "run cancelled");
        }
        info!(
            processed = counts.processed,
            transformed = counts.transformed,
            failed = counts.failed(),
            "migration finished"
        );
        RunSummary {
            report: self.report,
            counts,
            halted: self.halted,
            cancelled,
        }
    }
}

fn threshold_error(counts: &RunCounts, options: &MappingOptions) -> Option<RunError> {
    if counts.critical > options.max_critical_errors {
        return Some(RunError::TooManyCriticalErrors {
            count: counts.critical,
            limit: options.max_critical_errors,
        });
    }
    if counts.process > options.max_process_errors {
        return Some(RunError::TooManyProcessErrors {
            count: counts.process,
            limit: options.max_process_errors,
        });
    }
    if counts.unclassified > options.max_unclassified_errors {
        return Some(RunError::TooManyUnclassifiedErrors {
            count: counts.unclassified,
            limit: options.max_unclassified_errors,
        });
    }
    None
}

/// Map one source record; panics become unclassified errors.
fn map_source(
    mapper: &RecordMapper,
    source: &SourceRecord,
    report: &mut MigrationReport,
) -> Result<MappedRecord, RecordError> {
    let record = match &source.data {
        Ok(record) => record,
        Err(message) => {
            return Err(RecordError::Process {
                record_id: source.id.clone(),
                message: message.clone(),
            });
        }
    };
    panic::catch_unwind(AssertUnwindSafe(|| mapper.map_one(record, &source.id, report)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "mapping panicked".to_string());
            Err(RecordError::Unclassified {
                record_id: source.id.clone(),
                message,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_trip_only_when_exceeded() {
        let options = MappingOptions {
            max_critical_errors: 2,
            ..MappingOptions::default()
        };
        let mut counts = RunCounts {
            critical: 2,
            ..RunCounts::default()
        };
        assert_eq!(threshold_error(&counts, &options), None);
        counts.critical = 3;
        assert_eq!(
            threshold_error(&counts, &options),
            Some(RunError::TooManyCriticalErrors { count: 3, limit: 2 })
        );
    }
}
