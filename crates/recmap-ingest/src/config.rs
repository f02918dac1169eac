//! TOML run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use recmap_model::MappingOptions;

use crate::error::{IngestError, Result};

/// A reference data table and the target leaf it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefDataConfig {
    /// Table name used in report sections (`<name> mapping`).
    pub name: String,
    pub file: PathBuf,
    pub target: String,
    #[serde(default)]
    pub id_column: Option<String>,
    /// Legacy columns to match on; every non-`folio_` column when absent.
    #[serde(default)]
    pub key_columns: Option<Vec<String>>,
    /// Leave the leaf empty instead of using the `*` row.
    #[serde(default)]
    pub prevent_default: bool,
}

/// Everything a `map` run reads besides the records themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub mapping_file: PathBuf,
    pub schema_file: PathBuf,
    #[serde(default)]
    pub field_rules_file: Option<PathBuf>,
    #[serde(default)]
    pub options: MappingOptions,
    #[serde(default)]
    pub ref_data: Vec<RefDataConfig>,
}

impl RunConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| IngestError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load `path`; relative file paths are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_paths(base))
    }

    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.mapping_file = resolve(base, &self.mapping_file);
        self.schema_file = resolve(base, &self.schema_file);
        self.field_rules_file = self.field_rules_file.map(|file| resolve(base, &file));
        for table in &mut self.ref_data {
            table.file = resolve(base, &table.file);
        }
        self
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap_model::ConditionMode;

    const CONFIG: &str = r#"
mapping_file = "maps/user_mapping.json"
schema_file = "/schemas/user.json"

[options]
array_bound = 5
condition_mode = "strict"

[[ref_data]]
name = "Patron groups"
file = "maps/groups.tsv"
target = "patronGroup"
id_column = "folio_group"
"#;

    #[test]
    fn parses_and_resolves_relative_paths() {
        let config = RunConfig::from_toml_str(CONFIG, Path::new("run.toml"))
            .unwrap()
            .resolve_paths(Path::new("/work"));
        assert_eq!(config.mapping_file, Path::new("/work/maps/user_mapping.json"));
        assert_eq!(config.schema_file, Path::new("/schemas/user.json"));
        assert_eq!(config.field_rules_file, None);
        assert_eq!(config.options.array_bound, 5);
        assert_eq!(config.options.condition_mode, ConditionMode::Strict);
        assert_eq!(config.options.max_critical_errors, 500);
        assert_eq!(config.ref_data[0].file, Path::new("/work/maps/groups.tsv"));
        assert!(!config.ref_data[0].prevent_default);
    }

    #[test]
    fn missing_required_key_is_reported() {
        let err = RunConfig::from_toml_str("schema_file = \"s.json\"", Path::new("run.toml"))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration run.toml"));
    }
}
