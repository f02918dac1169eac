//! Markdown rendering of a [`MigrationReport`].

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::report::MigrationReport;
use crate::sections::{
    GENERAL_STATISTICS, INTRODUCTION, LEGACY_FIELDS_BLURB, LEGACY_FIELDS_TITLE,
    TARGET_FIELDS_BLURB, TARGET_FIELDS_TITLE, blurb,
};

/// Header data for the rendered document.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    pub title: String,
    /// Denominator for the percentage columns.
    pub total_records: u64,
    pub generated_at: Option<DateTime<Utc>>,
}

impl MarkdownOptions {
    pub fn new(total_records: u64) -> Self {
        Self {
            title: "Migration report".to_string(),
            total_records,
            generated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

/// Write the report as a markdown document.
///
/// Category sections come first (general statistics leading, the rest by
/// name), followed by the target field and legacy field tables.
pub fn write_markdown<W: Write>(
    report: &MigrationReport,
    options: &MarkdownOptions,
    writer: &mut W,
) -> io::Result<()> {
    writeln!(writer, "# {}", options.title)?;
    writeln!(writer)?;
    if let Some(at) = options.generated_at {
        writeln!(writer, "Generated {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(writer)?;
    }
    writeln!(writer, "{INTRODUCTION}")?;

    let general = report.section(GENERAL_STATISTICS).map(|m| (GENERAL_STATISTICS, m));
    let others = report
        .sections()
        .filter(|(name, _)| *name != GENERAL_STATISTICS);
    for (name, measures) in general.into_iter().chain(others) {
        writeln!(writer)?;
        writeln!(writer, "## {name}")?;
        writeln!(writer)?;
        writeln!(writer, "{}", blurb(name))?;
        writeln!(writer)?;
        writeln!(
            writer,
            "<details><summary>Click to expand all {} things</summary>",
            measures.len()
        )?;
        writeln!(writer)?;
        writeln!(writer, "Measure | Count")?;
        writeln!(writer, "--- | ---:")?;
        for (label, count) in measures {
            writeln!(writer, "{} | {count}", escape_cell(label))?;
        }
        writeln!(writer, "</details>")?;
    }

    let total = options.total_records;
    writeln!(writer)?;
    writeln!(writer, "## {TARGET_FIELDS_TITLE}")?;
    writeln!(writer)?;
    writeln!(writer, "{TARGET_FIELDS_BLURB}")?;
    writeln!(writer)?;
    writeln!(writer, "Field | Mapped | Empty | Unmapped")?;
    writeln!(writer, "--- | --- | --- | ---:")?;
    for (field, counts) in report.target_fields() {
        let mapped = counts.mapped();
        writeln!(
            writer,
            "{} | {mapped} ({}) | {} | {}",
            escape_cell(field),
            percent(mapped, total, 0),
            counts.empty,
            total.saturating_sub(counts.present),
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "## {LEGACY_FIELDS_TITLE}")?;
    writeln!(writer)?;
    writeln!(writer, "{LEGACY_FIELDS_BLURB}")?;
    writeln!(writer)?;
    writeln!(writer, "Field | Present | Mapped | Empty | Unmapped")?;
    writeln!(writer, "--- | --- | --- | --- | ---:")?;
    for (field, counts) in report.legacy_fields() {
        writeln!(
            writer,
            "{} | {} ({}) | {} ({}) | {} | {}",
            escape_cell(field),
            counts.present,
            percent(counts.present, total, 1),
            counts.mapped,
            percent(counts.mapped, total, 0),
            counts.empty,
            counts.unmapped(),
        )?;
    }
    Ok(())
}

/// Render to a string.
pub fn to_markdown(report: &MigrationReport, options: &MarkdownOptions) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_markdown(report, options, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

fn percent(part: u64, total: u64, decimals: usize) -> String {
    let ratio = if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    };
    format!("{:.*}%", decimals, ratio * 100.0)
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
