//! Aggregation through to CSV files on disk.

use std::sync::Arc;

use export::{combine, ExportPlanner, ObjectStoreSink, Sink, SinkConfig, DEFAULT_COMBINED_NAME};
use pentad_common::BoundingBox;
use raster_source::{InMemoryRaster, RasterSource};
use test_utils::{create_constant_grid, grid_csv};
use zonal_stats::{load_csv, GridOptions, RasterCatalogEntry, SamplingParams, ZonalAggregator};

fn raster(extent: BoundingBox, bands: &[(&str, f32)]) -> Arc<dyn RasterSource> {
    let mut raster = InMemoryRaster::new("fixture", extent, (10, 10));
    for (name, value) in bands {
        raster
            .add_band(*name, create_constant_grid(10, 10, *value))
            .unwrap();
    }
    Arc::new(raster)
}

/// 1 km sampling keeps a one degree cell well under the default pixel cap.
fn aggregator() -> ZonalAggregator {
    ZonalAggregator::new(SamplingParams {
        scale: 1000.0,
        ..Default::default()
    })
    .unwrap()
}

// ============================================================================
// Local sink
// ============================================================================

#[tokio::test]
async fn test_bandless_export_written_to_local_folder() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("export_folder");

    let grid = load_csv(grid_csv::TWO_CELLS.as_bytes(), GridOptions::default())
        .unwrap()
        .grid;
    let entry = RasterCatalogEntry::new(
        "NASADEM",
        raster(BoundingBox::new(0.0, 0.0, 1.0, 1.0), &[("elevation", 1250.0)]),
    );
    let set = aggregator().aggregate(&grid, &entry).unwrap();
    let table = ExportPlanner::plan(&grid, &set).unwrap();

    let sink = ObjectStoreSink::from_config(&SinkConfig::Local {
        folder: folder.clone(),
    })
    .unwrap();
    let receipt = sink.write(&table).await.unwrap();
    assert_eq!(receipt.rows, 2);

    let written = std::fs::read_to_string(folder.join("mean_values_NASADEM.csv")).unwrap();
    assert_eq!(written, "pentad,NASADEM\nP1,1250\nP2,\n");
}

#[tokio::test]
async fn test_banded_export_columns() {
    let grid = load_csv(grid_csv::TWO_CELLS.as_bytes(), GridOptions::default())
        .unwrap()
        .grid;
    let entry = RasterCatalogEntry::new(
        "X",
        raster(
            BoundingBox::new(0.0, 0.0, 2.0, 1.0),
            &[("A", 1.0), ("B", 2.0), ("C", 3.0)],
        ),
    )
    .with_bands(["B", "A"]);
    let set = aggregator().aggregate(&grid, &entry).unwrap();
    let table = ExportPlanner::plan(&grid, &set).unwrap();

    let sink = ObjectStoreSink::in_memory("export_folder");
    sink.write(&table).await.unwrap();

    let bytes = sink.read("mean_values_X.csv").await.unwrap();
    let text = std::str::from_utf8(&bytes).unwrap();
    assert_eq!(text, "pentad,X_B,X_A\nP1,2,1\nP2,2,1\n");
}

// ============================================================================
// Combined table
// ============================================================================

#[tokio::test]
async fn test_combined_table_written_alongside_sources() {
    let grid = load_csv(grid_csv::TWO_CELLS.as_bytes(), GridOptions::default())
        .unwrap()
        .grid;
    let aggregator = aggregator();

    let dem = RasterCatalogEntry::new(
        "DEM",
        raster(BoundingBox::new(0.0, 0.0, 2.0, 1.0), &[("elevation", 900.0)]),
    );
    let veg = RasterCatalogEntry::new(
        "VEG",
        raster(BoundingBox::new(1.0, 0.0, 2.0, 1.0), &[("NDVI", 0.5)]),
    )
    .with_bands(["NDVI"]);

    let sink = ObjectStoreSink::in_memory("out");
    let mut tables = Vec::new();
    for entry in [&dem, &veg] {
        let set = aggregator.aggregate(&grid, entry).unwrap();
        let table = ExportPlanner::plan(&grid, &set).unwrap();
        sink.write(&table).await.unwrap();
        tables.push(table);
    }

    let combined = combine(DEFAULT_COMBINED_NAME, &grid, &tables).unwrap();
    sink.write(&combined).await.unwrap();

    assert_eq!(
        sink.list().await.unwrap(),
        vec![
            "out/mean_values_DEM.csv",
            "out/mean_values_VEG.csv",
            "out/mean_values_combined.csv",
        ]
    );
    let bytes = sink.read("mean_values_combined.csv").await.unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        "pentad,DEM,VEG_NDVI\nP1,900,\nP2,900,0.5\n"
    );
}
