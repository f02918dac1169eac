//! Integration tests for the markdown migration report.

use recmap_report::sections::{GENERAL_STATISTICS, ref_data_section, stats};
use recmap_report::{MarkdownOptions, MigrationReport, to_markdown};

fn sample_report() -> MigrationReport {
    let mut report = MigrationReport::new();
    report.set(GENERAL_STATISTICS, stats::RECORDS_PROCESSED, 4);
    let groups = ref_data_section("Patron groups");
    report.add(&groups, "Group name -> G");
    report.add(&groups, "Unmapped -- Unknown -> Fallback");
    report.add(&groups, "Group name -> G");
    for empty in [false, false, true, false] {
        report.report_target_field("username", true, empty);
        report.report_legacy_present("user_name", empty);
        if !empty {
            report.report_legacy_mapped("user_name");
        }
    }
    report.report_target_field("barcode", true, false);
    report.report_target_field("lastCheckIn (skipped)", false, false);
    report
}

fn tail_from<'a>(document: &'a str, heading: &str) -> &'a str {
    let start = document.find(heading).unwrap();
    &document[start..]
}

#[test]
fn field_tables_snapshot() {
    let document = to_markdown(&sample_report(), &MarkdownOptions::new(4));
    insta::assert_snapshot!(tail_from(&document, "## Mapped target fields"), @r"
    ## Mapped target fields

    Library action: **REVIEW**<br/>How many of the created records carry data in each target field. Compare the mapped totals with what the source data should produce.

    Field | Mapped | Empty | Unmapped
    --- | --- | --- | ---:
    barcode | 1 (25%) | 0 | 3
    lastCheckIn (skipped) | 0 (0%) | 0 | 4
    username | 3 (75%) | 1 | 0

    ## Mapped legacy fields

    Library action: **REVIEW**<br/>Every legacy field seen in the source data and how often it fed a target field. Fields with a high unmapped count may hold data worth adding to the mapping.

    Field | Present | Mapped | Empty | Unmapped
    --- | --- | --- | --- | ---:
    user_name | 4 (100.0%) | 3 (75%) | 1 | 1
    ");
}

#[test]
fn general_statistics_section_comes_first() {
    let document = to_markdown(&sample_report(), &MarkdownOptions::new(4));
    let general = document.find("## General statistics").unwrap();
    let groups = document.find("## Patron groups mapping").unwrap();
    assert!(general < groups);
    assert!(document.contains("Group name -> G | 2"));
    assert!(document.contains("Click to expand all 2 things"));
    assert!(document.starts_with("# Migration report\n"));
}

#[test]
fn generated_timestamp_is_optional() {
    use chrono::TimeZone;
    let at = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    let document = to_markdown(
        &MigrationReport::new(),
        &MarkdownOptions::new(0).with_title("Users").generated_at(at),
    );
    assert!(document.starts_with("# Users\n\nGenerated 2024-03-01 12:30:00 UTC\n"));
}

#[test]
fn report_serializes_to_json() {
    let value = serde_json::to_value(sample_report()).unwrap();
    assert_eq!(value["target_fields"]["username"]["present"], 4);
    assert_eq!(value["legacy_fields"]["user_name"]["mapped"], 3);
    let back: MigrationReport = serde_json::from_value(value).unwrap();
    assert_eq!(back, sample_report());
}
