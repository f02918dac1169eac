use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span};

use recmap_cli::pipeline::{MapRequest, build_mapper, map_file};
use recmap_core::Schedule;
use recmap_ingest::{InputFormat, RunConfig, load_schema};
use recmap_model::ConditionMode;

use crate::cli::{MapArgs, SchemaArgs};
use crate::summary::{apply_table_style, flag_cell};
use crate::types::MapResult;

pub fn run_schema(args: &SchemaArgs) -> Result<()> {
    let schema = load_schema(&args.schema).context("load target schema")?;
    let mut table = Table::new();
    table.set_header(vec!["Path", "Type", "Required", "Deprecated", "Virtual"]);
    apply_table_style(&mut table);
    for leaf in schema.leaves() {
        table.add_row(vec![
            comfy_table::Cell::new(&leaf.path),
            comfy_table::Cell::new(&leaf.kind),
            flag_cell(leaf.required),
            flag_cell(leaf.deprecated),
            flag_cell(leaf.is_virtual),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_map(args: &MapArgs) -> Result<MapResult> {
    let span = info_span!("map", config = %args.config.display());
    let _guard = span.enter();

    let mut config = RunConfig::load(&args.config).context("load run configuration")?;
    if args.strict {
        config.options.condition_mode = ConditionMode::Strict;
    }
    if let Some(bound) = args.array_bound {
        config.options.array_bound = bound;
    }
    let mapper = build_mapper(&config)?;

    let format = match args.format {
        Some(format) => format.into(),
        None => InputFormat::from_path(&args.input)?,
    };
    let mut request = MapRequest::new(&args.input, format);
    if let Some(dir) = &args.output_dir {
        request.output_dir.clone_from(dir);
    }
    if args.parallel {
        request.schedule = Schedule::Parallel;
    }
    info!(
        input = %request.input.display(),
        format = ?request.format,
        schedule = ?request.schedule,
        "mapping records"
    );

    let progress = progress_bar()?;
    let outcome = map_file(&mapper, &request, |read| progress.inc(read))?;
    progress.finish_and_clear();
    Ok(MapResult { request, outcome })
}

fn progress_bar() -> Result<ProgressBar> {
    if !io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {pos} records read [{elapsed_precise}]")
            .context("progress template")?,
    );
    Ok(bar)
}
