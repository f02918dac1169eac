//! Migration report for record mapping runs.
//!
//! [`MigrationReport`] collects per-field counters and categorized tallies
//! while records are mapped; [`write_markdown`] renders the end-of-run
//! document.

mod markdown;
mod report;
pub mod sections;

pub use markdown::{MarkdownOptions, to_markdown, write_markdown};
pub use report::{LegacyFieldCounts, MigrationReport, TargetFieldCounts};
