//! Aggregation pipeline: one export per catalog source.
//!
//! Sources run concurrently (bounded by `concurrency.sources`); within a
//! source every cell is a blocking task bounded by a semaphore shared across
//! sources and by a per-cell timeout. A source's table is planned only after
//! all of its cells have finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use export::{combine, ExportPlanner, ExportTable, ObjectStoreSink, Sink};
use futures::stream::{self, StreamExt};
use pentad_common::PentadError;
use raster_source::{RasterProvider, ZarrProvider};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use zonal_stats::{
    load_csv_path, AggregateSet, BandPlan, CellOutcome, Grid, RasterCatalogEntry, ZonalAggregator,
};

use crate::config::{CatalogEntryConfig, CombineConfig, ConcurrencyConfig, RunConfig};
use crate::summary::{ExportStatus, RunSummary, SourceSummary};

/// Everything a run needs, already resolved.
pub struct Pipeline {
    grid: Arc<Grid>,
    rejected_records: usize,
    catalog: Vec<CatalogEntryConfig>,
    provider: Arc<dyn RasterProvider>,
    sink: Arc<dyn Sink>,
    aggregator: ZonalAggregator,
    concurrency: ConcurrencyConfig,
    cell_timeout: Duration,
    combine: CombineConfig,
    cell_permits: Arc<Semaphore>,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        grid: Grid,
        catalog: Vec<CatalogEntryConfig>,
        provider: Arc<dyn RasterProvider>,
        sink: Arc<dyn Sink>,
        aggregator: ZonalAggregator,
        concurrency: ConcurrencyConfig,
    ) -> Self {
        Self {
            grid: Arc::new(grid),
            rejected_records: 0,
            catalog,
            provider,
            sink,
            aggregator,
            cell_permits: Arc::new(Semaphore::new(concurrency.cells.max(1))),
            cell_timeout: concurrency.cell_timeout(),
            concurrency,
            combine: CombineConfig::default(),
            dry_run: false,
        }
    }

    /// Build the grid, raster provider and sink described by a run config.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let grid_path = config.grid_path();
        let load = load_csv_path(&grid_path, config.grid.options)
            .with_context(|| format!("Failed to load grid from {:?}", grid_path))?;
        info!(
            path = ?grid_path,
            cells = load.grid.len(),
            rejected = load.rejected.len(),
            "Loaded pentad grid"
        );

        let provider = Arc::new(ZarrProvider::new(&config.raster).with_base_dir(config.base_dir.clone()));
        let sink = ObjectStoreSink::from_config(&config.resolved_sink())
            .context("Failed to create export sink")?;
        info!(sink = %sink.describe(), "Export sink ready");

        let mut pipeline = Self::new(
            load.grid,
            config.catalog.clone(),
            provider,
            Arc::new(sink),
            ZonalAggregator::new(config.sampling)?,
            config.concurrency,
        )
        .with_combine(config.combine.clone());
        pipeline.rejected_records = load.rejected.len();
        Ok(pipeline)
    }

    pub fn with_combine(mut self, combine: CombineConfig) -> Self {
        self.combine = combine;
        self
    }

    /// Override the per-cell timeout from the concurrency settings.
    pub fn with_cell_timeout(mut self, timeout: Duration) -> Self {
        self.cell_timeout = timeout;
        self
    }

    /// Aggregate and plan, but write nothing.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Run every source, then the combined export.
    #[instrument(skip(self), fields(sources = self.catalog.len(), cells = self.grid.len(), dry_run = self.dry_run))]
    pub async fn run(&self) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut results: Vec<(usize, SourceSummary, Option<ExportTable>)> =
            stream::iter(self.catalog.iter().enumerate())
                .map(|(index, entry)| async move {
                    let (summary, table) = self.run_source(entry).await;
                    (index, summary, table)
                })
                .buffer_unordered(self.concurrency.sources.max(1))
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut sources = Vec::with_capacity(results.len());
        let mut tables = Vec::new();
        for (_, summary, table) in results {
            sources.push(summary);
            tables.extend(table);
        }

        let combined = if self.combine.enabled {
            Some(self.write_combined(&tables).await)
        } else {
            None
        };

        RunSummary {
            started_at,
            dry_run: self.dry_run,
            grid_cells: self.grid.len(),
            rejected_records: self.rejected_records,
            sources,
            combined,
            chunk_cache: self.provider.cache_stats(),
            elapsed_ms: elapsed_ms(start),
        }
    }

    /// Run one source. Returns its table when it was planned successfully
    /// and written (or the run is dry).
    #[instrument(skip(self, entry), fields(source = %entry.name))]
    pub async fn run_source(&self, entry: &CatalogEntryConfig) -> (SourceSummary, Option<ExportTable>) {
        let start = Instant::now();

        let plan = match self.open_source(entry).await {
            Ok(plan) => plan,
            Err(e) => return (SourceSummary::failed(&entry.name, &e, elapsed_ms(start)), None),
        };
        info!(columns = ?plan.column_names(), "Aggregating source");

        let set = self.aggregate_source(Arc::new(plan)).await;

        let mut summary = SourceSummary {
            name: entry.name.clone(),
            columns: set.columns.clone(),
            status: ExportStatus::Skipped { rows: 0 },
            degraded_cells: set.degraded(),
            errors_by_kind: set.error_counts(),
            elapsed_ms: 0,
        };

        let table = match ExportPlanner::plan(&self.grid, &set) {
            Ok(table) => table,
            Err(e) => {
                summary.status = ExportStatus::failed(&e.into());
                summary.elapsed_ms = elapsed_ms(start);
                return (summary, None);
            }
        };

        let written = self.write(&table).await;
        summary.elapsed_ms = elapsed_ms(start);
        let keep = !written.is_failed();
        summary.status = written;
        (summary, keep.then_some(table))
    }

    /// Open the raster and validate the entry against it.
    async fn open_source(&self, entry: &CatalogEntryConfig) -> Result<BandPlan, PentadError> {
        let provider = Arc::clone(&self.provider);
        let name = entry.name.clone();
        let spec = entry.raster.clone();

        let raster = tokio::task::spawn_blocking(move || provider.open(&name, &spec))
            .await
            .map_err(|e| invalid_entry(entry, e.to_string()))?
            .map_err(|e| invalid_entry(entry, format!("cannot open raster: {}", e)))?;

        RasterCatalogEntry {
            name: entry.name.clone(),
            bands: entry.bands.clone(),
            best_effort: entry.best_effort,
            raster,
        }
        .plan()
    }

    /// Aggregate every cell of the grid for one plan.
    async fn aggregate_source(&self, plan: Arc<BandPlan>) -> AggregateSet {
        let mut set = AggregateSet::new(&plan.source_name, plan.column_names());
        let timeout = self.cell_timeout;
        let mut tasks = JoinSet::new();

        for index in 0..self.grid.len() {
            let Ok(permit) = Arc::clone(&self.cell_permits).acquire_owned().await else {
                warn!("Cell semaphore closed, remaining cells not sampled");
                break;
            };
            let grid = Arc::clone(&self.grid);
            let plan = Arc::clone(&plan);
            let aggregator = self.aggregator;

            tasks.spawn(sample_cell(aggregator, grid, index, plan, permit, timeout));
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut set, joined);
        }

        fill_unreported(&mut set, &self.grid);

        info!(
            cells = set.len(),
            degraded = set.degraded(),
            "Aggregated source"
        );
        set
    }

    async fn write(&self, table: &ExportTable) -> ExportStatus {
        if self.dry_run {
            info!(table = %table.name, rows = table.len(), "Dry run, export not written");
            return ExportStatus::Skipped { rows: table.len() };
        }
        match self.sink.write(table).await {
            Ok(receipt) => ExportStatus::exported(&receipt),
            Err(e) => ExportStatus::failed(&e.into()),
        }
    }

    async fn write_combined(&self, tables: &[ExportTable]) -> ExportStatus {
        if tables.is_empty() {
            warn!("No source exported, combined table not written");
            return ExportStatus::Skipped { rows: 0 };
        }
        match combine(&self.combine.name, &self.grid, tables) {
            Ok(table) => self.write(&table).await,
            Err(e) => ExportStatus::failed(&e.into()),
        }
    }
}

/// Sample one cell on the blocking pool, bounded by `timeout`.
///
/// The permit is released only when the blocking work ends, so timed-out
/// cells still count against the cell limit until they notice the cancel flag.
async fn sample_cell(
    aggregator: ZonalAggregator,
    grid: Arc<Grid>,
    index: usize,
    plan: Arc<BandPlan>,
    permit: OwnedSemaphorePermit,
    timeout: Duration,
) -> (String, CellOutcome) {
    let pentad = grid.cells()[index].pentad.clone();
    let source_name = plan.source_name.clone();
    let cancel = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&cancel);
    let handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        aggregator.aggregate_cell_until(&grid.cells()[index], &plan, &flag)
    });

    let outcome = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(PentadError::SamplingFailure {
            pentad: pentad.clone(),
            source_name,
            message: format!("sampling task failed: {}", join_error),
        }),
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            Err(PentadError::Timeout {
                pentad: pentad.clone(),
                source_name,
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    };
    (pentad, outcome)
}

fn record(
    set: &mut AggregateSet,
    joined: std::result::Result<(String, CellOutcome), tokio::task::JoinError>,
) {
    match joined {
        Ok((pentad, outcome)) => {
            if let Err(e) = &outcome {
                warn!(pentad = %pentad, kind = %e.kind(), error = %e, "Cell degraded");
            }
            set.insert(pentad, outcome);
        }
        Err(e) => warn!(error = %e, "Cell task failed"),
    }
}

/// Record a `SamplingFailure` for every cell whose task never reported,
/// so that panicked tasks still count as degraded cells.
fn fill_unreported(set: &mut AggregateSet, grid: &Grid) {
    for cell in grid {
        if set.get(&cell.pentad).is_none() {
            let err = PentadError::SamplingFailure {
                pentad: cell.pentad.clone(),
                source_name: set.source_name.clone(),
                message: "cell task did not complete".to_string(),
            };
            set.insert(cell.pentad.clone(), Err(err));
        }
    }
}

fn invalid_entry(entry: &CatalogEntryConfig, reason: String) -> PentadError {
    PentadError::InvalidCatalogEntry {
        source_name: entry.name.clone(),
        reason,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pentad_common::ErrorKind;
    use zonal_stats::{load, AggregateRecord, BoundsRecord, GridOptions};

    #[test]
    fn test_unreported_cells_count_as_degraded() {
        let records = vec![
            BoundsRecord::new(2, "P1", 0.0, 0.0, 1.0, 1.0),
            BoundsRecord::new(3, "P2", 1.0, 0.0, 2.0, 1.0),
        ];
        let grid = load(records, GridOptions::default()).unwrap().grid;
        let columns = vec!["A".to_string()];
        let mut set = AggregateSet::new("A", columns.clone());
        set.insert("P1", Ok(AggregateRecord::missing("P1", &columns)));

        fill_unreported(&mut set, &grid);

        assert_eq!(set.len(), 2);
        assert_eq!(set.degraded(), 1);
        assert_eq!(set.error_counts().get(&ErrorKind::SamplingFailure), Some(&1));
        assert!(set.record("P1").is_some());
    }
}
