//! Common types and utilities shared across the pentad-covariates crates.

pub mod bbox;
pub mod error;
pub mod naming;

pub use bbox::{BboxError, BoundingBox};
pub use error::{ErrorKind, PentadError, PentadResult};
pub use naming::{column_name, export_name, PENTAD_COLUMN};
