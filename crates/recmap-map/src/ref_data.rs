//! Reference data lookup: legacy codes to target identifiers.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use tracing::debug;

use recmap_model::{LegacyRecord, RefDataTable, WILDCARD, strip_indices};
use recmap_report::MigrationReport;
use recmap_report::sections::ref_data_section;

use crate::error::CriticalDataError;

/// Result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefDataOutcome {
    /// A row matched every key column.
    Matched { id: String, name: String },
    /// Nothing matched; the default row was used.
    Defaulted { id: String, name: String },
    /// Nothing matched and defaulting was disabled or unavailable.
    NoDefault,
}

impl RefDataOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Matched { id, .. } | Self::Defaulted { id, .. } => id,
            Self::NoDefault => "",
        }
    }
}

/// Normalized key cell: `None` for `*`.
type KeyCell = Option<String>;

#[derive(Debug, Default)]
struct RefIndex {
    /// Fully specified key tuples to the first row carrying them.
    exact: HashMap<Vec<String>, usize>,
    /// Rows with some (not all) wildcard key cells, in file order.
    partial: Vec<(usize, Vec<KeyCell>)>,
    default_row: Option<usize>,
}

/// Lookup over one [`RefDataTable`].
///
/// The index is built on first use and shared by every worker.
#[derive(Debug)]
pub struct RefDataResolver {
    table: RefDataTable,
    index: OnceLock<RefIndex>,
}

impl RefDataResolver {
    pub fn new(table: RefDataTable) -> Self {
        Self {
            table,
            index: OnceLock::new(),
        }
    }

    pub fn table(&self) -> &RefDataTable {
        &self.table
    }

    fn index(&self) -> &RefIndex {
        self.index.get_or_init(|| build_index(&self.table))
    }

    /// Look up the row for `record`'s key column values.
    ///
    /// A key column missing from the record is a critical data error.
    pub fn lookup(
        &self,
        record: &LegacyRecord,
        prevent_default: bool,
        report: &mut MigrationReport,
    ) -> Result<RefDataOutcome, CriticalDataError> {
        let mut raw_values = Vec::with_capacity(self.table.key_columns.len());
        for column in &self.table.key_columns {
            let value = record.text(column).ok_or_else(|| {
                CriticalDataError::new(format!(
                    "{} - {} ({}) '{column}' is not a recognized field in the legacy data",
                    self.table.name,
                    self.table.id_column,
                    self.table.key_columns.join(", "),
                ))
            })?;
            raw_values.push(value);
        }
        let keys: Vec<String> = raw_values.iter().map(|value| normalize(value)).collect();
        let shown = raw_values.join(" - ");
        let section = ref_data_section(&self.table.name);

        if let Some(row) = self.find_row(&keys) {
            let row = &self.table.rows[row];
            let id = self.table.id_of(row).to_string();
            let name = self.table.name_of(row).to_string();
            report.add(&section, &format!("{shown} -> {name}"));
            debug!(table = %self.table.name, %id, "reference data matched");
            return Ok(RefDataOutcome::Matched { id, name });
        }

        let default_row = self.index().default_row.filter(|_| !prevent_default);
        match default_row {
            Some(row) => {
                let row = &self.table.rows[row];
                let id = self.table.id_of(row).to_string();
                let name = self.table.name_of(row).to_string();
                report.add(&section, &format!("Unmapped -- {shown} -> {name}"));
                Ok(RefDataOutcome::Defaulted { id, name })
            }
            None => {
                report.add(&section, &format!("Unmapped -- {shown} -> \"\" (No default)"));
                Ok(RefDataOutcome::NoDefault)
            }
        }
    }

    fn find_row(&self, keys: &[String]) -> Option<usize> {
        let index = self.index();
        if let Some(&row) = index.exact.get(keys) {
            return Some(row);
        }
        index
            .partial
            .iter()
            .find(|(_, cells)| {
                cells
                    .iter()
                    .zip(keys)
                    .all(|(cell, key)| cell.as_ref().is_none_or(|cell| cell == key))
            })
            .map(|(row, _)| *row)
    }
}

fn build_index(table: &RefDataTable) -> RefIndex {
    let mut index = RefIndex::default();
    for (row_index, row) in table.rows.iter().enumerate() {
        let cells: Vec<KeyCell> = table
            .key_columns
            .iter()
            .map(|column| {
                let cell = row.get(column).map_or("", String::as_str).trim();
                (cell != WILDCARD).then(|| normalize(cell))
            })
            .collect();
        let wildcards = cells.iter().filter(|cell| cell.is_none()).count();
        if wildcards == 0 {
            let key: Vec<String> = cells.into_iter().flatten().collect();
            index.exact.entry(key).or_insert(row_index);
        } else if wildcards == cells.len() {
            index.default_row.get_or_insert(row_index);
        } else {
            index.partial.push((row_index, cells));
        }
    }
    index
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A table bound to a target path, with its defaulting policy.
#[derive(Debug)]
pub struct RefDataBinding {
    pub resolver: RefDataResolver,
    pub prevent_default: bool,
}

/// Reference data tables keyed by index-free target path.
#[derive(Debug, Default)]
pub struct RefDataBindings {
    by_target: BTreeMap<String, RefDataBinding>,
}

impl RefDataBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `table` to `target`; slot indices in `target` are ignored.
    pub fn bind(&mut self, target: &str, table: RefDataTable, prevent_default: bool) {
        self.by_target.insert(
            strip_indices(target),
            RefDataBinding {
                resolver: RefDataResolver::new(table),
                prevent_default,
            },
        );
    }

    /// Binding for a leaf path such as `departments[2]`.
    pub fn for_path(&self, path: &str) -> Option<&RefDataBinding> {
        if self.by_target.is_empty() {
            return None;
        }
        self.by_target.get(&strip_indices(path))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.by_target.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}
