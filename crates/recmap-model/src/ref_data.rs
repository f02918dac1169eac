//! Reference data tables (legacy code -> target identifier).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Key cell matching any legacy value.
pub const WILDCARD: &str = "*";

/// Prefix marking target-side columns in a ref-data file.
pub const TARGET_COLUMN_PREFIX: &str = "folio_";

pub type RefDataRow = BTreeMap<String, String>;

/// A loaded lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefDataTable {
    pub name: String,
    /// Legacy columns compared against the record, in header order.
    pub key_columns: Vec<String>,
    pub id_column: String,
    /// Column used in report labels; the id column when absent.
    pub name_column: String,
    pub rows: Vec<RefDataRow>,
}

impl RefDataTable {
    /// Build a table from header-ordered columns and rows.
    ///
    /// Key columns are every column not prefixed `folio_`. The id column
    /// defaults to `folio_id`, else the first `folio_` column.
    pub fn new(
        name: impl Into<String>,
        columns: &[String],
        rows: Vec<RefDataRow>,
        id_column: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let target_columns: Vec<&String> = columns
            .iter()
            .filter(|column| column.starts_with(TARGET_COLUMN_PREFIX))
            .collect();
        let id_column = match id_column {
            Some(configured) => {
                if !columns.iter().any(|column| column == configured) {
                    return Err(invalid(
                        &name,
                        &format!("id column '{configured}' not in header"),
                    ));
                }
                configured.to_string()
            }
            None => target_columns
                .iter()
                .find(|column| column.as_str() == "folio_id")
                .or_else(|| target_columns.first())
                .map(|column| (*column).clone())
                .ok_or_else(|| invalid(&name, "no folio_ id column"))?,
        };
        let key_columns: Vec<String> = columns
            .iter()
            .filter(|column| !column.starts_with(TARGET_COLUMN_PREFIX) && **column != id_column)
            .cloned()
            .collect();
        if key_columns.is_empty() {
            return Err(invalid(&name, "no legacy key columns"));
        }
        let name_column = if columns.iter().any(|column| column == "folio_name") {
            "folio_name".to_string()
        } else {
            id_column.clone()
        };
        Ok(Self {
            name,
            key_columns,
            id_column,
            name_column,
            rows,
        })
    }

    /// Restrict matching to the given legacy columns.
    pub fn with_key_columns(mut self, key_columns: Vec<String>) -> Self {
        self.key_columns = key_columns;
        self
    }

    /// Row whose key cells are all `*`.
    pub fn default_row(&self) -> Option<&RefDataRow> {
        self.rows.iter().find(|row| {
            self.key_columns
                .iter()
                .all(|column| row.get(column).is_some_and(|cell| cell.trim() == WILDCARD))
        })
    }

    pub fn id_of<'a>(&self, row: &'a RefDataRow) -> &'a str {
        row.get(&self.id_column).map_or("", String::as_str)
    }

    pub fn name_of<'a>(&self, row: &'a RefDataRow) -> &'a str {
        row.get(&self.name_column)
            .or_else(|| row.get(&self.id_column))
            .map_or("", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn invalid(table: &str, message: &str) -> ModelError {
    ModelError::InvalidRefData {
        table: table.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RefDataRow {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn infers_key_and_id_columns() {
        let table = RefDataTable::new(
            "Patron groups",
            &columns(&["group", "folio_group"]),
            vec![
                row(&[("group", "Group name"), ("folio_group", "G")]),
                row(&[("group", "*"), ("folio_group", "Fallback")]),
            ],
            None,
        )
        .unwrap();
        assert_eq!(table.key_columns, vec!["group"]);
        assert_eq!(table.id_column, "folio_group");
        assert_eq!(table.name_column, "folio_group");
        let default = table.default_row().unwrap();
        assert_eq!(table.id_of(default), "Fallback");
    }

    #[test]
    fn prefers_folio_id_and_folio_name() {
        let table = RefDataTable::new(
            "Locations",
            &columns(&["code", "folio_name", "folio_id"]),
            vec![row(&[("code", "MAIN"), ("folio_name", "Main"), ("folio_id", "uuid-1")])],
            None,
        )
        .unwrap();
        assert_eq!(table.id_column, "folio_id");
        assert_eq!(table.name_of(&table.rows[0]), "Main");
        assert!(table.default_row().is_none());
    }

    #[test]
    fn rejects_tables_without_keys_or_ids() {
        assert!(RefDataTable::new("t", &columns(&["folio_id"]), vec![], None).is_err());
        assert!(RefDataTable::new("t", &columns(&["code"]), vec![], None).is_err());
        assert!(RefDataTable::new("t", &columns(&["code", "folio_id"]), vec![], Some("folio_x")).is_err());
    }
}
