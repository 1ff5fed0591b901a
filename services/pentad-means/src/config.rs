//! Run configuration for the pentad-means runner.
//!
//! Loaded from one YAML file with `${VAR}` and `${VAR:-default}`
//! substitution. Relative paths (grid, rasters, local sink folder) are
//! resolved against the directory holding the file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use export::{SinkConfig, DEFAULT_COMBINED_NAME};
use raster_source::{RasterConfig, RasterSpec};
use serde::{Deserialize, Serialize};
use zonal_stats::{GridOptions, SamplingParams};

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub sampling: SamplingParams,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Falls back to `EXPORT_SINK`/`EXPORT_FOLDER` when the file has no `sink`.
    #[serde(default = "SinkConfig::from_env")]
    pub sink: SinkConfig,
    #[serde(default)]
    pub combine: CombineConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    pub catalog: Vec<CatalogEntryConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub options: GridOptions,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Sources aggregated at the same time.
    pub sources: usize,
    /// Cells sampled at the same time, across all sources.
    pub cells: usize,
    pub cell_timeout_secs: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            sources: 2,
            cells: 8,
            cell_timeout_secs: 300,
        }
    }
}

impl ConcurrencyConfig {
    pub fn cell_timeout(&self) -> Duration {
        Duration::from_secs(self.cell_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    pub enabled: bool,
    pub name: String,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: DEFAULT_COMBINED_NAME.to_string(),
        }
    }
}

/// One catalog entry as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntryConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_effort: Option<bool>,
    pub raster: RasterSpec,
}

impl RunConfig {
    /// Grid path resolved against the config directory.
    pub fn grid_path(&self) -> PathBuf {
        self.resolve(&self.grid.path)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Sink config with a relative local folder resolved.
    pub fn resolved_sink(&self) -> SinkConfig {
        match &self.sink {
            SinkConfig::Local { folder } => SinkConfig::Local {
                folder: self.resolve(folder),
            },
            other => other.clone(),
        }
    }

    /// Keep only the named catalog entries, in catalog order.
    pub fn retain_sources(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            anyhow::ensure!(
                self.catalog.iter().any(|e| &e.name == name),
                "Unknown source '{}'. Catalog has: {:?}",
                name,
                self.catalog.iter().map(|e| e.name.as_str()).collect::<Vec<_>>()
            );
        }
        self.catalog.retain(|e| names.contains(&e.name));
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.grid.path.as_os_str().is_empty(),
            "Grid path cannot be empty"
        );
        self.sampling
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid sampling parameters: {}", e))?;

        anyhow::ensure!(self.concurrency.sources >= 1, "concurrency.sources must be at least 1");
        anyhow::ensure!(self.concurrency.cells >= 1, "concurrency.cells must be at least 1");
        anyhow::ensure!(
            self.concurrency.cell_timeout_secs > 0,
            "concurrency.cell_timeout_secs must be greater than 0"
        );

        self.sink
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid sink: {}", e))?;
        self.raster
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid raster settings: {}", e))?;

        if self.combine.enabled {
            anyhow::ensure!(
                !self.combine.name.trim().is_empty(),
                "combine.name cannot be empty"
            );
        }

        anyhow::ensure!(!self.catalog.is_empty(), "Catalog has no entries");
        let mut names = HashSet::new();
        for entry in &self.catalog {
            anyhow::ensure!(!entry.name.trim().is_empty(), "Catalog entry name cannot be empty");
            anyhow::ensure!(
                names.insert(entry.name.as_str()),
                "Duplicate catalog entry name: {}",
                entry.name
            );
            if let Some(bands) = &entry.bands {
                anyhow::ensure!(
                    !bands.is_empty(),
                    "Catalog entry {} has an empty band list",
                    entry.name
                );
            }
            entry
                .raster
                .validate()
                .map_err(|e| anyhow::anyhow!("Catalog entry {}: {}", entry.name, e))?;
        }

        Ok(())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load, expand and validate a run configuration.
///
/// `SAMPLING_*` environment variables override the file's sampling section.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run config from {:?}", path))?;

    let mut config = parse_run_config(&content)
        .with_context(|| format!("Failed to parse run config from {:?}", path))?;
    config.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    config.sampling = config.sampling.with_env_overrides();

    config.validate()?;
    Ok(config)
}

/// Expand and parse YAML content without validating it.
pub fn parse_run_config(content: &str) -> Result<RunConfig> {
    let expanded = expand_env_vars(content)?;
    let config: RunConfig =
        serde_yaml::from_str(&expanded).context("Failed to parse run config YAML")?;
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => expand_env_vars(default),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
