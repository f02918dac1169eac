//! Mapping engine: turns one legacy record into one target object.
//!
//! The [`SchemaWalker`] drives the work. It visits every schema property,
//! asks the [`ValueResolver`] (or a bound [`RefDataResolver`]) for leaf
//! values and reports what it saw into a
//! [`MigrationReport`](recmap_report::MigrationReport).
//! Tag-driven rules for repeatable fields live in [`FieldRuleMapper`].

mod builder;
pub mod conditions;
mod error;
pub mod field_rules;
mod ref_data;
mod resolver;
mod rules;
mod walker;

pub use builder::ObjectBuilder;
pub use conditions::{Condition, ConditionPipeline};
pub use error::{CriticalDataError, FieldIssue, MapError, Result};
pub use field_rules::{FieldMapping, FieldRuleMapper, FieldRulesFile};
pub use ref_data::{RefDataBinding, RefDataBindings, RefDataOutcome, RefDataResolver};
pub use resolver::{Resolution, ValueResolver, ValueSource};
pub use rules::{CompiledRule, RuleSet};
pub use walker::SchemaWalker;
