use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::MapResult;

pub fn print_summary(result: &MapResult) {
    let outcome = &result.outcome;
    let counts = outcome.summary.counts;
    println!("Input: {}", result.request.input.display());
    println!("Objects: {}", outcome.paths.objects.display());
    println!("Failed records: {}", outcome.paths.failed.display());
    println!("Report: {}", outcome.paths.report.display());

    let mut table = Table::new();
    table.set_header(vec![header_cell("Measure"), header_cell("Records")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("Processed", counts.processed, None),
        ("Transformed", counts.transformed, Some(Color::Green)),
        ("Failed (data error)", counts.critical, Some(Color::Red)),
        ("Failed (process error)", counts.process, Some(Color::Red)),
        ("Failed (unclassified)", counts.unclassified, Some(Color::Red)),
        ("Not submitted", counts.not_submitted, Some(Color::Yellow)),
    ];
    for (label, count, color) in rows {
        table.add_row(vec![Cell::new(label), count_cell(count, color)]);
    }
    println!("{table}");

    if let Some(err) = &outcome.summary.halted {
        eprintln!("Run halted: {err}");
    }
}

pub fn flag_cell(flag: bool) -> Cell {
    if flag {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: u64, color: Option<Color>) -> Cell {
    match color {
        Some(color) if count > 0 => Cell::new(count).fg(color).add_attribute(Attribute::Bold),
        Some(_) => dim_cell(count),
        None => Cell::new(count),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
