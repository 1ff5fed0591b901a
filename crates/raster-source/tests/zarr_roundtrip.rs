//! Integration tests: write rasters with ZarrRasterWriter and read them back.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pentad_common::BoundingBox;
use raster_source::{
    InMemoryRaster, PixelWindow, RasterConfig, RasterProvider, RasterSource, RasterSpec,
    Reducer, ZarrCompression, ZarrProvider, ZarrRaster, ZarrRasterWriter,
};
use test_utils::{create_constant_grid, create_masked_grid, create_test_grid, temp_test_dir};

fn small_chunks(compression: ZarrCompression) -> RasterConfig {
    RasterConfig {
        zarr_chunk_size: 16,
        zarr_compression: compression,
        ..Default::default()
    }
}

/// A 50x40 two-band raster covering 0..50 x -20..20.
fn two_band_raster() -> InMemoryRaster {
    InMemoryRaster::new("test", BoundingBox::new(0.0, -20.0, 50.0, 20.0), (50, 40))
        .with_band("NDVI", create_test_grid(50, 40))
        .unwrap()
        .with_band("EVI", create_constant_grid(50, 40, 0.25))
        .unwrap()
}

#[test]
fn test_roundtrip_full_band() {
    let dir = temp_test_dir();
    let root = dir.path().join("MOD13A2");
    let raster = two_band_raster();

    let writer = ZarrRasterWriter::new(small_chunks(ZarrCompression::None));
    let results = writer.write_raster(&root, &raster).expect("write raster");
    assert_eq!(results.len(), 2);

    let opened = ZarrRaster::open(&root, &RasterConfig::default()).expect("open raster");
    let metadata = opened.metadata();
    assert_eq!(metadata.name, "test");
    assert_eq!(metadata.shape, (50, 40));
    // Band order follows band_index, not directory order
    assert_eq!(metadata.bands, vec!["NDVI".to_string(), "EVI".to_string()]);
    assert_eq!(metadata.extent, BoundingBox::new(0.0, -20.0, 50.0, 20.0));
    assert!(metadata.fill_value.is_nan());

    assert_eq!(opened.read_band("NDVI").unwrap(), create_test_grid(50, 40));
    assert!(opened.read_band("EVI").unwrap().iter().all(|v| *v == 0.25));
}

#[test]
fn test_window_across_chunk_boundaries() {
    let dir = temp_test_dir();
    let root = dir.path().join("raster");
    let writer = ZarrRasterWriter::new(small_chunks(ZarrCompression::BloscZstd));
    writer.write_raster(&root, &two_band_raster()).unwrap();

    let opened = ZarrRaster::open(&root, &RasterConfig::default()).unwrap();
    // Spans chunks (0..16, 16..32, 32..48) in x and (0..16, 16..32) in y
    let window = PixelWindow::new(10, 12, 30, 8);
    let result = opened.read_window("NDVI", &window).unwrap();

    assert_eq!(result.data.len(), 30 * 8);
    for row in window.row0..window.row_end() {
        for col in window.col0..window.col_end() {
            assert_eq!(result.get(col, row), Some((col * 1000 + row) as f32));
        }
    }
}

#[test]
fn test_cache_reused_between_reads() {
    let dir = temp_test_dir();
    let root = dir.path().join("raster");
    ZarrRasterWriter::new(small_chunks(ZarrCompression::None))
        .write_raster(&root, &two_band_raster())
        .unwrap();

    let opened = ZarrRaster::open(&root, &RasterConfig::default()).unwrap();
    let window = PixelWindow::new(0, 0, 8, 8);
    opened.read_window("NDVI", &window).unwrap();
    opened.read_window("NDVI", &window).unwrap();

    let stats = opened.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_fill_value_preserved() {
    let dir = temp_test_dir();
    let root = dir.path().join("NASADEM");
    let raster = InMemoryRaster::new("NASADEM", BoundingBox::new(0.0, 0.0, 4.0, 4.0), (4, 4))
        .with_band("elevation", create_masked_grid(4, 4, 1200.0, -9999.0, (0, 0, 2, 2)))
        .unwrap()
        .with_fill_value(-9999.0);

    ZarrRasterWriter::new(small_chunks(ZarrCompression::None))
        .write_raster(&root, &raster)
        .unwrap();

    let opened = ZarrRaster::open(&root, &RasterConfig::default()).unwrap();
    assert_eq!(opened.metadata().fill_value, -9999.0);
    let data = opened.read_band("elevation").unwrap();
    assert_eq!(data.iter().filter(|v| !opened.metadata().is_valid(**v)).count(), 4);
}

#[test]
fn test_open_empty_directory_fails() {
    let dir = temp_test_dir();
    assert!(ZarrRaster::open(dir.path(), &RasterConfig::default()).is_err());
}

#[test]
fn test_provider_builds_collection_composite() {
    let dir = temp_test_dir();
    let writer = ZarrRasterWriter::new(small_chunks(ZarrCompression::None));
    let extent = BoundingBox::new(20.0, -30.0, 22.0, -28.0);

    let scenes = [
        (1, "D", 0.10f32),
        (2, "A", 0.90f32),
        (3, "D", 0.30f32),
        // Outside the window
        (20, "D", 5.0f32),
    ];
    for (day, direction, value) in scenes {
        let scene = InMemoryRaster::new(format!("smap-{}", day), extent, (4, 4))
            .with_band("ssm", create_constant_grid(4, 4, value))
            .unwrap()
            .with_acquired(Utc.with_ymd_and_hms(2017, 6, day, 6, 0, 0).unwrap())
            .with_property("SATELLITE_DIRECTION", direction);
        writer
            .write_raster(&dir.path().join("smap").join(format!("scene-{:02}", day)), &scene)
            .unwrap();
    }

    let spec: RasterSpec = serde_json::from_value(serde_json::json!({
        "type": "collection",
        "scenes_dir": "smap",
        "start": "2017-06-01",
        "end": "2017-06-10",
        "filters": { "SATELLITE_DIRECTION": "D" },
        "reducer": "mean"
    }))
    .unwrap();

    let provider = ZarrProvider::new(&RasterConfig::default()).with_base_dir(dir.path());
    let raster = provider.open("SMAP", &spec).expect("composite");
    assert_eq!(raster.metadata().name, "SMAP");

    let data = raster.read_band("ssm").unwrap();
    assert!(data.iter().all(|v| (*v - 0.2).abs() < 1e-6));

    let first = RasterSpec::Collection {
        scenes: vec![PathBuf::from("smap/scene-03"), PathBuf::from("smap/scene-01")],
        scenes_dir: None,
        start: None,
        end: None,
        filters: Default::default(),
        reducer: Reducer::First,
    };
    let raster: Arc<dyn RasterSource> = provider.open("SMAP", &first).unwrap();
    assert!(raster.read_band("ssm").unwrap().iter().all(|v| *v == 0.10));
}
