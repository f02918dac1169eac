//! Output file layout for one input file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use recmap_report::{MarkdownOptions, MigrationReport, write_markdown};
use tracing::info;

use crate::error::{OutputError, Result};

pub const REPORT_FILE_NAME: &str = "migration_report.md";

/// Paths written for an input file named `<stem>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub objects: PathBuf,
    pub failed: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    pub fn for_input(output_dir: &Path, input: &Path) -> Self {
        let stem = input
            .file_stem()
            .map_or_else(|| "records".into(), |stem| stem.to_string_lossy());
        Self {
            objects: output_dir.join(format!("{stem}.objects.jsonl")),
            failed: output_dir.join(format!("{stem}.failed.jsonl")),
            report: output_dir.join(REPORT_FILE_NAME),
        }
    }
}

/// Create `dir` and its parents.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Create {
        path: dir.to_path_buf(),
        source,
    })
}

pub fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|source| OutputError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

/// Render the report as markdown into `path`.
pub fn write_report_file(
    path: &Path,
    report: &MigrationReport,
    options: &MarkdownOptions,
) -> Result<()> {
    let mut writer = create_writer(path)?;
    write_markdown(report, options, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), "migration report written");
    Ok(())
}
