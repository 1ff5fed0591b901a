//! Per-cell zonal means.

use std::sync::atomic::{AtomicBool, Ordering};

use pentad_common::{PentadError, PentadResult};
use tracing::instrument;

use crate::catalog::{BandPlan, RasterCatalogEntry};
use crate::grid::{Cell, Grid};
use crate::params::SamplingParams;
use crate::record::{AggregateRecord, AggregateSet, ColumnValue};
use crate::sampling::{PlanError, SampleGrid};

/// Computes the spatial mean of raster bands over grid cells.
///
/// Aggregation is a pure function of the cell, the band plan and the
/// sampling parameters: repeated calls give identical records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonalAggregator {
    params: SamplingParams,
}

impl ZonalAggregator {
    /// Fails with `Config` when the parameters do not validate.
    pub fn new(params: SamplingParams) -> PentadResult<Self> {
        params.validate().map_err(PentadError::Config)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Best-effort mode for a plan: the entry override, else the run default.
    pub fn best_effort_for(&self, plan: &BandPlan) -> bool {
        plan.best_effort.unwrap_or(self.params.best_effort)
    }

    /// Mean of every planned band over one cell.
    ///
    /// A cell that does not overlap the raster yields a record with every
    /// column missing. Exceeding `max_pixels` in strict mode yields
    /// `ResourceLimitExceeded`; a failed read yields `SamplingFailure`.
    pub fn aggregate_cell(&self, cell: &Cell, plan: &BandPlan) -> PentadResult<AggregateRecord> {
        self.aggregate_cell_until(cell, plan, &AtomicBool::new(false))
    }

    /// [`aggregate_cell`](Self::aggregate_cell) that gives up once `cancel` is set.
    ///
    /// The flag is checked before every band read and between sample rows.
    /// A cancelled cell yields `SamplingFailure`.
    pub fn aggregate_cell_until(
        &self,
        cell: &Cell,
        plan: &BandPlan,
        cancel: &AtomicBool,
    ) -> PentadResult<AggregateRecord> {
        let cancelled = || PentadError::SamplingFailure {
            pentad: cell.pentad.clone(),
            source_name: plan.source_name.clone(),
            message: "cancelled".to_string(),
        };

        let metadata = plan.raster.metadata();
        let columns = plan.column_names();

        let Some(area) = metadata.extent.intersection(&cell.bbox) else {
            return Ok(AggregateRecord::missing(&cell.pentad, &columns));
        };
        let Some(window) = metadata.pixel_window(&area) else {
            return Ok(AggregateRecord::missing(&cell.pentad, &columns));
        };

        let samples = SampleGrid::plan(
            &area,
            metadata.units,
            self.params.scale,
            self.params.max_pixels,
            self.best_effort_for(plan),
        )
        .map_err(|e| match e {
            PlanError::InvalidScale(scale) => {
                PentadError::Config(format!("scale must be a positive number, got {}", scale))
            }
            PlanError::LimitExceeded {
                required,
                max_pixels,
            } => PentadError::ResourceLimitExceeded {
                pentad: cell.pentad.clone(),
                source_name: plan.source_name.clone(),
                required,
                max_pixels,
            },
        })?;

        if samples.effective_scale != self.params.scale {
            tracing::debug!(
                source = %plan.source_name,
                pentad = %cell.pentad,
                requested = self.params.scale,
                effective = samples.effective_scale,
                "Coarsened sampling to fit max_pixels"
            );
        }

        let mut values = Vec::with_capacity(plan.columns.len());
        for planned in &plan.columns {
            if cancel.load(Ordering::Relaxed) {
                return Err(cancelled());
            }
            let pixels = plan
                .raster
                .read_window(&planned.band, &window)
                .map_err(|e| PentadError::SamplingFailure {
                    pentad: cell.pentad.clone(),
                    source_name: plan.source_name.clone(),
                    message: e.to_string(),
                })?;

            let mut sum = 0.0f64;
            let mut count = 0u64;
            for (i, (x, y)) in samples.points().enumerate() {
                if i as u64 % samples.nx == 0 && cancel.load(Ordering::Relaxed) {
                    return Err(cancelled());
                }
                let value = metadata
                    .coords_to_cell(x, y)
                    .and_then(|(col, row)| pixels.get(col, row));
                if let Some(value) = value.filter(|v| metadata.is_valid(*v)) {
                    sum += value as f64;
                    count += 1;
                }
            }

            values.push(ColumnValue {
                column: planned.column.clone(),
                mean: (count > 0).then(|| sum / count as f64),
            });
        }

        Ok(AggregateRecord {
            pentad: cell.pentad.clone(),
            values,
            samples: samples.count(),
            effective_scale: Some(samples.effective_scale),
        })
    }

    /// Aggregate every cell of the grid for one catalog entry, in grid order.
    ///
    /// Fails only if the entry itself is invalid; per-cell errors are
    /// recorded in the returned set.
    #[instrument(skip_all, fields(source = %entry.name, cells = grid.len()))]
    pub fn aggregate(&self, grid: &Grid, entry: &RasterCatalogEntry) -> PentadResult<AggregateSet> {
        let plan = entry.plan()?;
        let mut set = AggregateSet::new(&plan.source_name, plan.column_names());

        for cell in grid {
            let outcome = self.aggregate_cell(cell, &plan);
            if let Err(e) = &outcome {
                tracing::warn!(pentad = %cell.pentad, error = %e, "Cell aggregation failed");
            }
            set.insert(cell.pentad.clone(), outcome);
        }

        tracing::info!(degraded = set.degraded(), "Aggregated source");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::grid::{load, BoundsRecord, GridOptions};
    use pentad_common::BoundingBox;
    use raster_source::{CoordinateUnits, InMemoryRaster, RasterSource};

    /// 10x10 metre raster of 1 m pixels, value = column index.
    fn gradient() -> Arc<dyn RasterSource> {
        let data: Vec<f32> = (0..100).map(|i| (i % 10) as f32).collect();
        Arc::new(
            InMemoryRaster::new("g", BoundingBox::new(0.0, 0.0, 10.0, 10.0), (10, 10))
                .with_band("v", data)
                .unwrap()
                .with_units(CoordinateUnits::Meters),
        )
    }

    fn cell(pentad: &str, bbox: BoundingBox) -> Cell {
        Cell {
            pentad: pentad.to_string(),
            bbox,
        }
    }

    fn aggregator(scale: f64) -> ZonalAggregator {
        ZonalAggregator::new(SamplingParams {
            scale,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mean_at_pixel_scale() {
        let plan = RasterCatalogEntry::new("G", gradient()).plan().unwrap();
        let record = aggregator(1.0)
            .aggregate_cell(&cell("P", BoundingBox::new(2.0, 0.0, 6.0, 10.0)), &plan)
            .unwrap();
        // columns 2..6 -> mean 3.5
        assert_eq!(record.value("G"), Some(3.5));
        assert_eq!(record.samples, 40);
        assert_eq!(record.effective_scale, Some(1.0));
    }

    #[test]
    fn test_cell_clipped_to_raster() {
        let plan = RasterCatalogEntry::new("G", gradient()).plan().unwrap();
        let record = aggregator(1.0)
            .aggregate_cell(&cell("P", BoundingBox::new(8.0, 5.0, 20.0, 20.0)), &plan)
            .unwrap();
        // only columns 8 and 9 are inside
        assert_eq!(record.value("G"), Some(8.5));
        assert_eq!(record.samples, 10);
    }

    #[test]
    fn test_no_overlap_is_missing() {
        let plan = RasterCatalogEntry::new("G", gradient()).plan().unwrap();
        let record = aggregator(1.0)
            .aggregate_cell(&cell("P", BoundingBox::new(20.0, 20.0, 30.0, 30.0)), &plan)
            .unwrap();
        assert!(record.is_all_missing());
        assert_eq!(record.samples, 0);
        assert_eq!(record.effective_scale, None);
    }

    #[test]
    fn test_all_invalid_is_missing_not_zero() {
        let raster: Arc<dyn RasterSource> = Arc::new(
            InMemoryRaster::new("nan", BoundingBox::new(0.0, 0.0, 2.0, 2.0), (2, 2))
                .with_band("v", vec![-1.0; 4])
                .unwrap()
                .with_fill_value(-1.0)
                .with_units(CoordinateUnits::Meters),
        );
        let plan = RasterCatalogEntry::new("N", raster).plan().unwrap();
        let record = aggregator(1.0)
            .aggregate_cell(&cell("P", BoundingBox::new(0.0, 0.0, 2.0, 2.0)), &plan)
            .unwrap();
        assert_eq!(record.value("N"), None);
        assert_eq!(record.samples, 4);
    }

    #[test]
    fn test_strict_limit_and_entry_override() {
        let params = SamplingParams {
            scale: 1.0,
            max_pixels: 10,
            best_effort: false,
        };
        let area = cell("P", BoundingBox::new(0.0, 0.0, 10.0, 10.0));

        let strict = RasterCatalogEntry::new("G", gradient()).plan().unwrap();
        let err = ZonalAggregator::new(params)
            .unwrap()
            .aggregate_cell(&area, &strict)
            .unwrap_err();
        assert!(matches!(
            err,
            PentadError::ResourceLimitExceeded {
                required: 100,
                max_pixels: 10,
                ..
            }
        ));

        let relaxed = RasterCatalogEntry::new("G", gradient())
            .with_best_effort(true)
            .plan()
            .unwrap();
        let record = ZonalAggregator::new(params)
            .unwrap()
            .aggregate_cell(&area, &relaxed)
            .unwrap();
        assert!(record.value("G").is_some());
        assert!(record.samples <= 10);
        assert_eq!(record.effective_scale, Some(4.0));
    }

    #[test]
    fn test_aggregate_records_every_cell() {
        let records = vec![
            BoundsRecord::new(2, "in", 0.0, 0.0, 5.0, 5.0),
            BoundsRecord::new(3, "out", 50.0, 50.0, 55.0, 55.0),
        ];
        let grid = load(records, GridOptions::default()).unwrap().grid;

        let entry = RasterCatalogEntry::new("G", gradient());
        let set = aggregator(1.0).aggregate(&grid, &entry).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.record("in").unwrap().value("G"), Some(2.0));
        assert!(set.record("out").unwrap().is_all_missing());
        assert_eq!(set.degraded(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_scale() {
        for scale in [0.0, -100.0, f64::INFINITY] {
            let err = ZonalAggregator::new(SamplingParams {
                scale,
                best_effort: true,
                ..Default::default()
            })
            .unwrap_err();
            assert_eq!(err.kind(), pentad_common::ErrorKind::Config);
        }
    }

    #[test]
    fn test_new_rejects_zero_max_pixels() {
        let err = ZonalAggregator::new(SamplingParams {
            max_pixels: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PentadError::Config(_)));
    }

    #[test]
    fn test_cancelled_cell_reads_nothing() {
        let plan = RasterCatalogEntry::new("G", gradient()).plan().unwrap();
        let err = aggregator(1.0)
            .aggregate_cell_until(
                &cell("P", BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
                &plan,
                &AtomicBool::new(true),
            )
            .unwrap_err();
        assert_eq!(err.kind(), pentad_common::ErrorKind::SamplingFailure);
        assert!(err.to_string().contains("cancelled"));
    }
}
