//! Zonal statistics over a pentad grid.
//!
//! For every cell of a rectangular grid and every band of a catalog entry,
//! compute the spatial mean of valid raster values under shared sampling
//! parameters:
//!
//! ```text
//! grid CSV ──► grid::load_csv ──► Grid
//!                                   │
//! RasterCatalogEntry ──► plan() ──► BandPlan
//!                                   │
//!              ZonalAggregator::aggregate_cell(cell, plan)
//!                                   │
//!                                   ▼
//!                 AggregateRecord { pentad, column -> mean | missing }
//! ```

pub mod aggregate;
pub mod catalog;
pub mod grid;
pub mod params;
pub mod record;
pub mod sampling;

pub use aggregate::ZonalAggregator;
pub use catalog::{BandPlan, PlannedColumn, RasterCatalogEntry};
pub use grid::{load, load_csv, load_csv_path, AxisOrder, BoundsRecord, Cell, Grid, GridLoad, GridOptions};
pub use params::SamplingParams;
pub use record::{AggregateRecord, AggregateSet, CellOutcome, ColumnValue};
pub use sampling::{PlanError, SampleGrid, METERS_PER_DEGREE};
