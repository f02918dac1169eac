//! Reading inputs from files on disk.

use std::fs;
use std::path::Path;

use recmap_ingest::{
    IngestError, InputFormat, RecordReader, RunConfig, load_ref_data, load_rule_table, load_schema,
};

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn tsv_records_with_malformed_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "users.tsv",
        "\u{feff}user_name\text_id\tgroup\nu1\t\tStaff\nbroken\nu3\te3\tFaculty\n",
    );
    let rows: Vec<_> = RecordReader::open(&path, InputFormat::Tsv).unwrap().collect();
    assert_eq!(rows.len(), 3);

    let first = rows[0].record.as_ref().unwrap();
    assert_eq!(first.text("user_name").as_deref(), Some("u1"));
    assert_eq!(first.text("ext_id").as_deref(), Some(""));
    assert_eq!(rows[0].id(), "1");

    assert!(matches!(rows[1].record, Err(IngestError::MalformedRow { row: 2, .. })));
    assert_eq!(rows[2].record.as_ref().unwrap().text("group").as_deref(), Some("Faculty"));
}

#[test]
fn marc_json_lines_use_control_number_as_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "bibs.jsonl",
        concat!(
            r#"{"fields": [{"001": "in001"}, {"245": {"ind1": "0", "ind2": "0", "subfields": [{"a": "Title"}]}}]}"#,
            "\n\n",
            r#"{"fields": [{"245": {"ind1": "0", "ind2": "0", "subfields": [{"a": "Other"}]}}]}"#,
            "\n",
            "not json\n",
        ),
    );
    let format = InputFormat::from_path(&path).unwrap();
    let rows: Vec<_> = RecordReader::open(&path, format).unwrap().collect();
    let ids: Vec<String> = rows.iter().map(|row| row.id()).collect();
    assert_eq!(ids, vec!["in001", "3", "4"]);
    assert!(rows[2].record.is_err());
}

#[test]
fn ref_data_table_from_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "groups.tsv",
        "group\tfolio_group\n Group name \tG\n*\tFallback\n",
    );
    let table = load_ref_data(&path, "Patron groups", None, None).unwrap();
    assert_eq!(table.key_columns, vec!["group"]);
    assert_eq!(table.id_column, "folio_group");
    insta::assert_json_snapshot!(table.rows, @r#"
    [
      {
        "folio_group": "G",
        "group": "Group name"
      },
      {
        "folio_group": "Fallback",
        "group": "*"
      }
    ]
    "#);
}

#[test]
fn config_files_load_relative_inputs() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "schema.json",
        r#"{"required": ["username"], "properties": {"username": {"type": "string"}}}"#,
    );
    write(
        dir.path(),
        "mapping.json",
        r#"{"data": [{"folio_field": "username", "legacy_field": "user_name", "value": ""}]}"#,
    );
    let config_path = write(
        dir.path(),
        "run.toml",
        "mapping_file = \"mapping.json\"\nschema_file = \"schema.json\"\n",
    );

    let config = RunConfig::load(&config_path).unwrap();
    let schema = load_schema(&config.schema_file).unwrap();
    let rules = load_rule_table(&config.mapping_file).unwrap();
    assert!(schema.is_required("username"));
    assert!(rules.is_mapped("username"));
}

#[test]
fn missing_file_names_path() {
    let err = load_schema(Path::new("/nonexistent/schema.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/schema.json"));
}
