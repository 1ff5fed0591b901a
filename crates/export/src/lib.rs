//! Export of per-pentad means.
//!
//! [`ExportPlanner`] turns an [`zonal_stats::AggregateSet`] into an
//! [`ExportTable`] (pure); a [`Sink`] writes it as CSV. [`combine`] joins
//! several tables on the pentad column.

pub mod combine;
pub mod config;
pub mod error;
pub mod planner;
pub mod sink;
pub mod table;

pub use combine::{combine, DEFAULT_COMBINED_NAME};
pub use config::{S3SinkConfig, SinkConfig};
pub use error::{ExportError, Result};
pub use planner::ExportPlanner;
pub use sink::{ObjectStoreSink, Sink, WriteReceipt};
pub use table::{ExportRow, ExportTable};
