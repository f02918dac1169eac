//! Map-file pipeline: build the mapper from a run configuration, then stream
//! one record file through a [`MigrationRun`] into the output files.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, info_span, warn};

use recmap_core::{MigrationRun, RecordMapper, RunSummary, Schedule, SourceRecord};
use recmap_ingest::{
    InputFormat, RecordReader, RecordRow, RunConfig, load_ref_data, load_rule_table, load_schema,
    read_json,
};
use recmap_map::FieldRulesFile;
use recmap_output::{
    BatchSerializer, OutputPaths, create_writer, ensure_output_dir, write_report_file,
};
use recmap_report::MarkdownOptions;

use crate::logging::redact_value;

/// Load schema, mapping file, reference data and field rules named by `config`.
pub fn build_mapper(config: &RunConfig) -> Result<RecordMapper> {
    let schema = load_schema(&config.schema_file).context("load target schema")?;
    let rules = load_rule_table(&config.mapping_file).context("load mapping file")?;
    let mut mapper = RecordMapper::new(schema, rules, config.options.clone())
        .context("compile mapping rules")?;

    for table in &config.ref_data {
        let data = load_ref_data(
            &table.file,
            &table.name,
            table.id_column.as_deref(),
            table.key_columns.as_deref(),
        )
        .with_context(|| format!("load reference data '{}'", table.name))?;
        mapper = mapper
            .with_ref_data(&table.target, data, table.prevent_default)
            .with_context(|| format!("bind reference data '{}'", table.name))?;
    }

    if let Some(path) = &config.field_rules_file {
        let file: FieldRulesFile = read_json(path).context("load field rules")?;
        mapper = mapper
            .with_field_rules(file)
            .context("compile field rules")?;
    }
    Ok(mapper)
}

/// One record file to map.
#[derive(Debug, Clone)]
pub struct MapRequest {
    pub input: PathBuf,
    pub format: InputFormat,
    pub output_dir: PathBuf,
    pub schedule: Schedule,
}

impl MapRequest {
    /// Sequential run writing next to the input, in `<input dir>/output`.
    pub fn new(input: &Path, format: InputFormat) -> Self {
        let output_dir = input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("output");
        Self {
            input: input.to_path_buf(),
            format,
            output_dir,
            schedule: Schedule::default(),
        }
    }
}

#[derive(Debug)]
pub struct MapOutcome {
    pub paths: OutputPaths,
    pub summary: RunSummary,
    pub objects_written: u64,
    pub failed_written: u64,
}

pub fn source_record(row: RecordRow) -> SourceRecord {
    let id = row.id();
    match row.record {
        Ok(record) => SourceRecord::new(id, record),
        Err(err) => {
            warn!(row = row.row, record = redact_value(&id), error = %err, "unreadable input row");
            SourceRecord::malformed(id, err.to_string())
        }
    }
}

/// Map every record of `request.input`.
///
/// Records are read in batches of `flush_batch_size`; `on_batch` receives the
/// number of records read after each batch. Reading stops once a failure
/// threshold halts the run; the report is written in every case.
pub fn map_file(
    mapper: &RecordMapper,
    request: &MapRequest,
    on_batch: impl FnMut(u64),
) -> Result<MapOutcome> {
    let span = info_span!("map_file", input = %request.input.display());
    let _guard = span.enter();

    ensure_output_dir(&request.output_dir)?;
    let paths = OutputPaths::for_input(&request.output_dir, &request.input);
    let reader = RecordReader::open(&request.input, request.format)
        .with_context(|| format!("open {}", request.input.display()))?;
    let sinks = RunSinks {
        objects: create_writer(&paths.objects)?,
        failed: create_writer(&paths.failed)?,
        report: paths.report.clone(),
    };
    let streamed = map_rows(mapper, reader, sinks, request.schedule, on_batch)?;
    info!(
        objects = streamed.objects_written,
        failed = streamed.failed_written,
        output = %request.output_dir.display(),
        "outputs written"
    );
    Ok(MapOutcome {
        paths,
        summary: streamed.summary,
        objects_written: streamed.objects_written,
        failed_written: streamed.failed_written,
    })
}

/// Where one run writes its objects, failed records and report.
pub struct RunSinks<O, F> {
    pub objects: O,
    pub failed: F,
    pub report: PathBuf,
}

/// Counts of a finished [`map_rows`] call.
#[derive(Debug)]
pub struct Streamed {
    pub summary: RunSummary,
    pub objects_written: u64,
    pub failed_written: u64,
}

/// Stream `rows` through a [`MigrationRun`] into `sinks`.
///
/// A write error stops reading, but the run is still wrapped up and the
/// report written before the error is returned.
pub fn map_rows<O: Write, F: Write>(
    mapper: &RecordMapper,
    mut rows: impl Iterator<Item = RecordRow>,
    sinks: RunSinks<O, F>,
    schedule: Schedule,
    mut on_batch: impl FnMut(u64),
) -> Result<Streamed> {
    let batch_size = mapper.options().flush_batch_size.max(1);
    let mut objects = BatchSerializer::new(sinks.objects, batch_size);
    let mut failed = BatchSerializer::new(sinks.failed, batch_size);
    let mut run = MigrationRun::new(mapper).with_schedule(schedule);
    let mut write_error: Option<anyhow::Error> = None;

    loop {
        let batch: Vec<SourceRecord> = rows
            .by_ref()
            .take(batch_size)
            .map(source_record)
            .collect();
        if batch.is_empty() {
            break;
        }
        let read = batch.len() as u64;
        let output = run.process_batch(batch);
        let written = objects
            .extend(output.mapped.into_iter().map(|mapped| mapped.object))
            .context("write mapped objects")
            .and_then(|()| failed.extend(output.failed).context("write failed records"));
        on_batch(read);
        if let Err(err) = written {
            error!(error = %format!("{err:#}"), "output write failed, stopping run");
            write_error = Some(err);
            break;
        }
        if !run.is_open() {
            break;
        }
    }

    let objects_written = objects.written() + objects.pending() as u64;
    let failed_written = failed.written() + failed.pending() as u64;
    if let Err(err) = objects.finish() {
        write_error.get_or_insert_with(|| anyhow::Error::new(err).context("write mapped objects"));
    }
    if let Err(err) = failed.finish() {
        write_error.get_or_insert_with(|| anyhow::Error::new(err).context("write failed records"));
    }

    let summary = run.wrap_up();
    let options = MarkdownOptions::new(summary.counts.processed).generated_at(Utc::now());
    let report = write_report_file(&sinks.report, &summary.report, &options);
    if let Some(err) = write_error {
        if let Err(report_err) = report {
            warn!(error = %report_err, "migration report not written");
        }
        return Err(err);
    }
    report?;
    Ok(Streamed {
        summary,
        objects_written,
        failed_written,
    })
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::json;

    use recmap_model::{LegacyRecord, MappingFile, MappingOptions, RuleTable, TargetSchema};

    use super::*;

    /// Rejects every write, like a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn mapper() -> RecordMapper {
        let schema = TargetSchema::from_json(&json!({
            "properties": {"username": {"type": "string"}}
        }))
        .unwrap();
        let file: MappingFile = serde_json::from_value(json!({"data": [
            {"folio_field": "username", "legacy_field": "user_name"}
        ]}))
        .unwrap();
        let options = MappingOptions {
            flush_batch_size: 2,
            ..MappingOptions::default()
        };
        RecordMapper::new(schema, RuleTable::new(file).unwrap(), options).unwrap()
    }

    fn rows(count: u64) -> impl Iterator<Item = RecordRow> {
        (1..=count).map(|row| RecordRow {
            row,
            record: Ok(LegacyRecord::from_pairs([("user_name", format!("u{row}"))])),
        })
    }

    #[test]
    fn report_is_written_when_object_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("migration_report.md");
        let sinks = RunSinks {
            objects: FullDisk,
            failed: Vec::new(),
            report: report.clone(),
        };
        let mut batches = 0;
        let err = map_rows(&mapper(), rows(6), sinks, Schedule::Sequential, |_| batches += 1)
            .unwrap_err();

        assert!(format!("{err:#}").starts_with("write mapped objects"));
        assert_eq!(batches, 1);
        let text = std::fs::read_to_string(&report).unwrap();
        assert!(text.contains("## General statistics"));
    }

    #[test]
    fn rows_stream_into_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = RunSinks {
            objects: Vec::new(),
            failed: Vec::new(),
            report: dir.path().join("migration_report.md"),
        };
        let streamed = map_rows(&mapper(), rows(3), sinks, Schedule::Sequential, |_| {}).unwrap();
        assert_eq!(streamed.objects_written, 3);
        assert_eq!(streamed.failed_written, 0);
        assert_eq!(streamed.summary.counts.processed, 3);
    }
}
