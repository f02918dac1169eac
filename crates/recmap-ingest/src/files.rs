//! JSON mapping files, schemas and reference data tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use tracing::info;

use recmap_model::{MappingFile, RefDataRow, RefDataTable, RuleTable, TargetSchema};

use crate::error::{IngestError, Result};

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize a whole JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_schema(path: &Path) -> Result<TargetSchema> {
    let text = read_text(path)?;
    TargetSchema::from_json_str(&text).map_err(|source| IngestError::Model {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_rule_table(path: &Path) -> Result<RuleTable> {
    let file: MappingFile = read_json(path)?;
    let count = file.data.len();
    let table = RuleTable::new(file).map_err(|source| IngestError::Model {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        rules = count,
        targets = table.mapped_targets().count(),
        "mapping file loaded"
    );
    Ok(table)
}

/// Field delimiter for a file, chosen by extension (`.tsv` means tab).
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Read a reference data table. Header cells and values are trimmed.
pub fn load_ref_data(
    path: &Path,
    name: &str,
    id_column: Option<&str>,
    key_columns: Option<&[String]>,
) -> Result<RefDataTable> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .from_path(path)
        .map_err(csv_error)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: RefDataRow = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|value| value.trim().to_string()))
            .collect::<BTreeMap<_, _>>();
        rows.push(row);
    }

    let table = RefDataTable::new(name, &headers, rows, id_column).map_err(|source| {
        IngestError::Model {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let table = match key_columns {
        Some(columns) => table.with_key_columns(columns.to_vec()),
        None => table,
    };
    info!(
        table = name,
        rows = table.len(),
        keys = %table.key_columns.join(", "),
        "reference data loaded"
    );
    Ok(table)
}
