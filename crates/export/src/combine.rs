//! Outer join of per-source exports into one covariate table.

use std::collections::{HashMap, HashSet};

use zonal_stats::Grid;

use crate::error::{ExportError, Result};
use crate::table::ExportTable;

/// Default name of the combined table.
pub const DEFAULT_COMBINED_NAME: &str = "mean_values_combined";

/// Join `tables` on pentad.
///
/// Rows follow grid order; pentads found only in a table are appended in
/// first-seen order. Columns follow table order. A pentad absent from a
/// table is missing in that table's columns.
pub fn combine(name: &str, grid: &Grid, tables: &[ExportTable]) -> Result<ExportTable> {
    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    for table in tables {
        for column in &table.columns {
            if !seen.insert(column.as_str()) {
                return Err(ExportError::Combine(format!(
                    "column '{}' appears in more than one table",
                    column
                )));
            }
            columns.push(column.clone());
        }
    }

    let mut pentads: Vec<&str> = grid.iter().map(|c| c.pentad.as_str()).collect();
    let mut known: HashSet<&str> = pentads.iter().copied().collect();
    for table in tables {
        for row in &table.rows {
            if known.insert(row.pentad.as_str()) {
                pentads.push(row.pentad.as_str());
            }
        }
    }

    let indexes: Vec<HashMap<&str, usize>> = tables
        .iter()
        .map(|t| {
            t.rows
                .iter()
                .enumerate()
                .map(|(i, row)| (row.pentad.as_str(), i))
                .collect()
        })
        .collect();

    let mut combined = ExportTable::new(name, columns);
    for pentad in pentads {
        let mut values = Vec::with_capacity(combined.columns.len());
        for (table, index) in tables.iter().zip(&indexes) {
            match index.get(pentad) {
                Some(&i) => values.extend_from_slice(&table.rows[i].values),
                None => values.extend(std::iter::repeat(None).take(table.columns.len())),
            }
        }
        combined.push_row(pentad, values)?;
    }

    tracing::info!(
        table = %combined.name,
        sources = tables.len(),
        columns = combined.columns.len(),
        rows = combined.len(),
        "Combined export tables"
    );
    Ok(combined)
}
