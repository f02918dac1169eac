pub mod error;
pub mod options;
pub mod path;
pub mod record;
pub mod ref_data;
pub mod rule;
pub mod schema;
pub mod value;

pub use error::{ModelError, Result};
pub use options::{ConditionMode, MappingOptions};
pub use path::{PathSegment, TargetPath, child_path, slot_path, strip_indices};
pub use record::{FieldInstance, LegacyRecord, LegacyValue, Subfield};
pub use ref_data::{RefDataRow, RefDataTable, WILDCARD};
pub use rule::{MappingFile, MappingRule, RuleDirectives, RuleTable, split_condition_names};
pub use schema::{NodeKind, PropertySchema, ScalarType, SchemaLeaf, TargetSchema};
pub use value::{NOT_MAPPED, display_value, is_empty_value, is_unset_literal};
