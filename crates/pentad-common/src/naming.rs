//! Output column and export naming.
//!
//! Downstream consumers join exports on these names, so they must never
//! depend on anything but the catalog name and band name.

/// Name of the identifier column present in every export.
pub const PENTAD_COLUMN: &str = "pentad";

/// Prefix of every per-source export name.
pub const EXPORT_PREFIX: &str = "mean_values_";

/// Column name for a source value.
///
/// `<source>` for a band-less source, `<source>_<band>` otherwise.
pub fn column_name(source: &str, band: Option<&str>) -> String {
    match band {
        Some(band) => format!("{}_{}", source, band),
        None => source.to_string(),
    }
}

/// Export (file/table) name for a source: `mean_values_<source>`.
pub fn export_name(source: &str) -> String {
    format!("{}{}", EXPORT_PREFIX, source)
}
