//! CLI argument definitions for the record migration tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use recmap_ingest::InputFormat;

#[derive(Parser)]
#[command(
    name = "recmap",
    version,
    about = "Map legacy records to schema-defined target objects",
    long_about = "Map legacy records (CSV, TSV or MARC-in-JSON) to JSON objects described \
                  by a target schema.\n\n\
                  Writes the mapped objects as JSON lines, the failed records, and a \
                  markdown migration report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow legacy field values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Map a file of legacy records.
    Map(MapArgs),

    /// List the leaves of a target schema.
    Schema(SchemaArgs),
}

#[derive(Parser)]
pub struct MapArgs {
    /// Run configuration (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: PathBuf,

    /// Legacy record file.
    #[arg(long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Input layout; guessed from the extension when omitted.
    #[arg(long = "format", value_enum)]
    pub format: Option<InputFormatArg>,

    /// Output directory (default: <INPUT_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Map records on all cores.
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Reject unknown condition names instead of passing values through.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Number of slots tried for each array property.
    #[arg(long = "array-bound", value_name = "N")]
    pub array_bound: Option<usize>,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Target schema (JSON).
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormatArg {
    Csv,
    Tsv,
    MarcJson,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => Self::Csv,
            InputFormatArg::Tsv => Self::Tsv,
            InputFormatArg::MarcJson => Self::MarcJson,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
