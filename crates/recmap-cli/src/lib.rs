//! Library side of the `recmap` command: logging setup and the map-file pipeline.

pub mod logging;
pub mod pipeline;
