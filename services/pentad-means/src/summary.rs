//! Run summary: what happened to every source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use export::WriteReceipt;
use pentad_common::{ErrorKind, PentadError};
use raster_source::CacheStats;
use serde::Serialize;
use tracing::{error, info, warn};

/// Final state of one export.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
    Exported {
        rows: usize,
        location: String,
        bytes: usize,
    },
    /// Planned but not written (dry run).
    Skipped { rows: usize },
    Failed { kind: ErrorKind, error: String },
}

impl ExportStatus {
    pub fn exported(receipt: &WriteReceipt) -> Self {
        Self::Exported {
            rows: receipt.rows,
            location: receipt.location.clone(),
            bytes: receipt.bytes,
        }
    }

    pub fn failed(err: &PentadError) -> Self {
        Self::Failed {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub status: ExportStatus,
    /// Cells whose outcome was an error.
    pub degraded_cells: usize,
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,
    pub elapsed_ms: u64,
}

impl SourceSummary {
    /// A source that failed before any cell was aggregated.
    pub fn failed(name: impl Into<String>, err: &PentadError, elapsed_ms: u64) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            status: ExportStatus::failed(err),
            degraded_cells: 0,
            errors_by_kind: BTreeMap::new(),
            elapsed_ms,
        }
    }

    pub fn log(&self) {
        match &self.status {
            ExportStatus::Failed { kind, error } => error!(
                source = %self.name,
                kind = %kind,
                error = %error,
                elapsed_ms = self.elapsed_ms,
                "Source failed"
            ),
            status => {
                if self.degraded_cells > 0 {
                    warn!(
                        source = %self.name,
                        degraded_cells = self.degraded_cells,
                        errors_by_kind = ?self.errors_by_kind,
                        "Source has degraded cells"
                    );
                }
                info!(
                    source = %self.name,
                    status = ?status,
                    elapsed_ms = self.elapsed_ms,
                    "Source finished"
                );
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub grid_cells: usize,
    /// Grid records excluded by `skip_malformed`.
    pub rejected_records: usize,
    /// Sources in catalog order.
    pub sources: Vec<SourceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<ExportStatus>,
    pub chunk_cache: CacheStats,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.status.is_failed()).count()
    }

    pub fn degraded_cells(&self) -> usize {
        self.sources.iter().map(|s| s.degraded_cells).sum()
    }

    /// True when no source and no combined export failed.
    pub fn is_success(&self) -> bool {
        self.failed_sources() == 0
            && !self.combined.as_ref().is_some_and(ExportStatus::is_failed)
    }

    pub fn source(&self, name: &str) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn log(&self) {
        for source in &self.sources {
            source.log();
        }
        info!(
            sources = self.sources.len(),
            failed_sources = self.failed_sources(),
            degraded_cells = self.degraded_cells(),
            grid_cells = self.grid_cells,
            cache_hit_rate = self.chunk_cache.hit_rate(),
            elapsed_ms = self.elapsed_ms,
            "Run finished"
        );
    }
}
