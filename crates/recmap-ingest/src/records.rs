//! Legacy record readers.
//!
//! Delimited files become flat records (header -> cell). MARC-in-JSON files
//! hold one record per line; control fields become single values and data
//! fields become repeated instances.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use serde_json::Value;

use recmap_model::{FieldInstance, LegacyRecord};

use crate::error::{IngestError, Result};
use crate::files::delimiter_for;

/// Layout of a legacy record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    MarcJson,
}

impl InputFormat {
    /// Guess from the extension: `.csv`, `.tsv`, `.json`/`.jsonl`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("tsv") => Ok(Self::Tsv),
            Some("json" | "jsonl") => Ok(Self::MarcJson),
            _ => Err(IngestError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "marc-json" | "marcjson" => Ok(Self::MarcJson),
            other => Err(format!("unknown input format '{other}'")),
        }
    }
}

/// One item from a record file: its 1-based row and the parsed record.
#[derive(Debug)]
pub struct RecordRow {
    pub row: u64,
    pub record: Result<LegacyRecord>,
}

impl RecordRow {
    /// Identifier used in logs and failure files: the `001` control field
    /// when present, else the row number.
    pub fn id(&self) -> String {
        self.record
            .as_ref()
            .ok()
            .and_then(|record| record.text("001"))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.row.to_string())
    }
}

/// Streaming reader over a record file.
pub enum RecordReader {
    Delimited {
        headers: Vec<String>,
        rows: StringRecordsIntoIter<File>,
        row: u64,
    },
    MarcJson {
        lines: std::io::Lines<BufReader<File>>,
        row: u64,
    },
}

impl RecordReader {
    pub fn open(path: &Path, format: InputFormat) -> Result<Self> {
        match format {
            InputFormat::Csv | InputFormat::Tsv => {
                let delimiter = if format == InputFormat::Tsv {
                    b'\t'
                } else {
                    delimiter_for(path)
                };
                let csv_error = |source| IngestError::Csv {
                    path: path.to_path_buf(),
                    source,
                };
                let mut reader = ReaderBuilder::new()
                    .delimiter(delimiter)
                    .has_headers(true)
                    .from_path(path)
                    .map_err(csv_error)?;
                let headers = reader
                    .headers()
                    .map_err(csv_error)?
                    .iter()
                    .map(|header| header.trim_matches('\u{feff}').trim().to_string())
                    .collect();
                Ok(Self::Delimited {
                    headers,
                    rows: reader.into_records(),
                    row: 0,
                })
            }
            InputFormat::MarcJson => {
                let file = File::open(path).map_err(|source| IngestError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::MarcJson {
                    lines: BufReader::new(file).lines(),
                    row: 0,
                })
            }
        }
    }
}

impl Iterator for RecordReader {
    type Item = RecordRow;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Delimited { headers, rows, row } => {
                let result = rows.next()?;
                *row += 1;
                let record = result
                    .map_err(|err| IngestError::MalformedRow {
                        row: *row,
                        message: err.to_string(),
                    })
                    .and_then(|cells| delimited_record(headers, &cells, *row));
                Some(RecordRow { row: *row, record })
            }
            Self::MarcJson { lines, row } => loop {
                let line = lines.next()?;
                *row += 1;
                let record = match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => parse_marc_json(&line).map_err(|message| {
                        IngestError::MalformedRow { row: *row, message }
                    }),
                    Err(err) => Err(IngestError::MalformedRow {
                        row: *row,
                        message: err.to_string(),
                    }),
                };
                return Some(RecordRow { row: *row, record });
            },
        }
    }
}

fn delimited_record(headers: &[String], cells: &StringRecord, row: u64) -> Result<LegacyRecord> {
    if cells.len() != headers.len() {
        return Err(IngestError::MalformedRow {
            row,
            message: format!("found {} fields, header has {}", cells.len(), headers.len()),
        });
    }
    Ok(LegacyRecord::from_pairs(
        headers.iter().map(String::as_str).zip(cells.iter()),
    ))
}

/// Parse one MARC-in-JSON record.
pub fn parse_marc_json(line: &str) -> std::result::Result<LegacyRecord, String> {
    let value: Value = serde_json::from_str(line).map_err(|err| err.to_string())?;
    let fields = value
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| "record has no \"fields\" array".to_string())?;
    let mut record = LegacyRecord::new();
    for field in fields {
        let entries = field
            .as_object()
            .ok_or_else(|| "field entry is not an object".to_string())?;
        for (tag, content) in entries {
            match content {
                Value::String(text) => record.insert(tag.as_str(), text.as_str()),
                Value::Object(_) => {
                    let instance: FieldInstance = serde_json::from_value(content.clone())
                        .map_err(|err| format!("field {tag}: {err}"))?;
                    record.push_field(tag.as_str(), instance);
                }
                other => return Err(format!("field {tag}: unexpected value {other}")),
            }
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a/users.TSV")).unwrap(), InputFormat::Tsv);
        assert_eq!(InputFormat::from_path(Path::new("bibs.jsonl")).unwrap(), InputFormat::MarcJson);
        assert!(InputFormat::from_path(Path::new("bibs.mrc")).is_err());
        assert_eq!("marc-json".parse::<InputFormat>(), Ok(InputFormat::MarcJson));
    }

    #[test]
    fn marc_json_fields() {
        let record = parse_marc_json(
            r#"{"leader": "00000nam", "fields": [
                {"001": "in00001"},
                {"245": {"ind1": "1", "ind2": "4", "subfields": [{"a": "The cat"}, {"c": "X"}]}},
                {"650": {"ind1": " ", "ind2": "0", "subfields": [{"a": "Cats"}]}},
                {"650": {"ind1": " ", "ind2": "0", "subfields": [{"a": "Pets"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(record.text("001").as_deref(), Some("in00001"));
        assert_eq!(record.instances("650").len(), 2);
        assert_eq!(record.indicator2("245"), Some(4));
        assert!(!record.contains("leader"));
    }

    #[test]
    fn marc_json_without_fields_is_rejected() {
        let err = parse_marc_json(r#"{"leader": "x"}"#).unwrap_err();
        assert_eq!(err, "record has no \"fields\" array");
    }
}
