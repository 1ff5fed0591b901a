//! Raster catalog entries and their band plans.

use std::collections::HashSet;
use std::sync::Arc;

use pentad_common::{column_name, PentadError, PentadResult};
use raster_source::RasterSource;

/// One raster source of the catalog.
#[derive(Clone)]
pub struct RasterCatalogEntry {
    /// Display name, used for column and export names. Unique per run.
    pub name: String,
    /// Ordered band selection. `None` uses the raster's first band as a
    /// single implicit field.
    pub bands: Option<Vec<String>>,
    /// Per-entry override of `SamplingParams::best_effort`.
    pub best_effort: Option<bool>,
    pub raster: Arc<dyn RasterSource>,
}

impl std::fmt::Debug for RasterCatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCatalogEntry")
            .field("name", &self.name)
            .field("bands", &self.bands)
            .field("best_effort", &self.best_effort)
            .field("raster", &self.raster.metadata().name)
            .finish()
    }
}

impl RasterCatalogEntry {
    /// A band-less entry.
    pub fn new(name: impl Into<String>, raster: Arc<dyn RasterSource>) -> Self {
        Self {
            name: name.into(),
            bands: None,
            best_effort: None,
            raster,
        }
    }

    pub fn with_bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands = Some(bands.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = Some(best_effort);
        self
    }

    /// Validate the entry against its raster and resolve output columns.
    ///
    /// Fails with `UnknownBand` if a listed band is absent from the raster and
    /// with `InvalidCatalogEntry` for an empty name, an empty or duplicated
    /// band list, or a raster without bands.
    pub fn plan(&self) -> PentadResult<BandPlan> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("catalog name is empty"));
        }

        let metadata = self.raster.metadata();
        let columns = match &self.bands {
            Some(bands) => {
                if bands.is_empty() {
                    return Err(self.invalid("band list is empty"));
                }
                let mut seen = HashSet::new();
                let mut columns = Vec::with_capacity(bands.len());
                for band in bands {
                    if !seen.insert(band.as_str()) {
                        return Err(self.invalid(&format!("band '{}' is listed twice", band)));
                    }
                    if !metadata.has_band(band) {
                        return Err(PentadError::UnknownBand {
                            source_name: self.name.clone(),
                            band: band.clone(),
                            available: metadata.bands.clone(),
                        });
                    }
                    columns.push(PlannedColumn {
                        column: column_name(&self.name, Some(band)),
                        band: band.clone(),
                    });
                }
                columns
            }
            None => {
                let band = metadata
                    .bands
                    .first()
                    .ok_or_else(|| self.invalid("raster has no bands"))?;
                vec![PlannedColumn {
                    column: column_name(&self.name, None),
                    band: band.clone(),
                }]
            }
        };

        Ok(BandPlan {
            source_name: self.name.clone(),
            columns,
            best_effort: self.best_effort,
            raster: Arc::clone(&self.raster),
        })
    }

    fn invalid(&self, reason: &str) -> PentadError {
        PentadError::InvalidCatalogEntry {
            source_name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// An output column and the band it is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub column: String,
    pub band: String,
}

/// A validated catalog entry, ready for aggregation.
#[derive(Clone)]
pub struct BandPlan {
    pub source_name: String,
    /// Output columns in declared band order.
    pub columns: Vec<PlannedColumn>,
    pub best_effort: Option<bool>,
    pub raster: Arc<dyn RasterSource>,
}

impl BandPlan {
    /// Output column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.column.clone()).collect()
    }
}

impl std::fmt::Debug for BandPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandPlan")
            .field("source_name", &self.source_name)
            .field("columns", &self.columns)
            .field("best_effort", &self.best_effort)
            .finish_non_exhaustive()
    }
}
