//! Batch runner computing per-pentad means for a raster catalog.
//!
//! This module exposes the runner's internals for the binary and for tests.

pub mod config;
pub mod pipeline;
pub mod summary;

pub use config::{load_run_config, parse_run_config, CatalogEntryConfig, RunConfig};
pub use pipeline::Pipeline;
pub use summary::{ExportStatus, RunSummary, SourceSummary};
