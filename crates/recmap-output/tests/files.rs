//! Writing run outputs to a temporary directory.

use std::fs;
use std::path::Path;

use recmap_output::{
    BatchSerializer, OutputPaths, create_writer, encode_batch, ensure_output_dir,
    write_report_file,
};
use recmap_report::sections::{GENERAL_STATISTICS, stats};
use recmap_report::{MarkdownOptions, MigrationReport};
use serde_json::json;

#[test]
fn paths_follow_input_stem() {
    let paths = OutputPaths::for_input(Path::new("/out"), Path::new("data/users.tsv"));
    assert_eq!(paths.objects, Path::new("/out/users.objects.jsonl"));
    assert_eq!(paths.failed, Path::new("/out/users.failed.jsonl"));
    assert_eq!(paths.report, Path::new("/out/migration_report.md"));
}

#[test]
fn writes_objects_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/run");
    ensure_output_dir(&out).unwrap();
    let paths = OutputPaths::for_input(&out, Path::new("users.csv"));

    let mut serializer = BatchSerializer::new(create_writer(&paths.objects).unwrap(), 3);
    serializer
        .extend((0..7).map(|index| json!({"username": format!("u{index}")})))
        .unwrap();
    serializer.finish().unwrap();

    let text = fs::read_to_string(&paths.objects).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], r#"{"username":"u0"}"#);
    assert_eq!(lines[6], r#"{"username":"u6"}"#);

    let mut report = MigrationReport::new();
    report.set(GENERAL_STATISTICS, stats::RECORDS_PROCESSED, 7);
    write_report_file(&paths.report, &report, &MarkdownOptions::new(7)).unwrap();
    let markdown = fs::read_to_string(&paths.report).unwrap();
    assert!(markdown.starts_with("# Migration report"));
    assert!(markdown.contains("Records processed | 7"));
}

#[test]
fn encoded_lines_are_compact_json() {
    let lines = encode_batch(&[
        json!({"id": "2", "kind": "critical", "message": "required field(s) missing"}),
        json!({"id": "7", "kind": "process"}),
    ])
    .unwrap();
    insta::assert_snapshot!(lines.join("\n"), @r#"
    {"id":"2","kind":"critical","message":"required field(s) missing"}
    {"id":"7","kind":"process"}
    "#);
}
