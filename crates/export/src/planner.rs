//! Builds export tables from aggregation results.

use pentad_common::export_name;
use tracing::instrument;
use zonal_stats::{AggregateSet, Grid};

use crate::error::Result;
use crate::table::ExportTable;

/// Selects and orders the columns of one source's export.
///
/// Planning is pure: the same grid and aggregate set always give the same
/// table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPlanner;

impl ExportPlanner {
    /// One row per grid cell in grid order, the source's columns in
    /// declared order. Failed or absent cells are missing in every column.
    #[instrument(skip_all, fields(source = %set.source_name, cells = grid.len()))]
    pub fn plan(grid: &Grid, set: &AggregateSet) -> Result<ExportTable> {
        let mut table = ExportTable::new(export_name(&set.source_name), set.columns.clone());
        let mut missing_cells = 0usize;

        for cell in grid {
            let values = match set.record(&cell.pentad) {
                Some(record) => set.columns.iter().map(|c| record.value(c)).collect(),
                None => {
                    missing_cells += 1;
                    vec![None; set.columns.len()]
                }
            };
            table.push_row(cell.pentad.clone(), values)?;
        }

        if missing_cells > 0 {
            tracing::debug!(missing_cells, "Cells without a record exported as missing");
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pentad_common::PentadError;
    use zonal_stats::{load, AggregateRecord, BoundsRecord, ColumnValue, GridOptions};

    fn grid() -> Grid {
        let records = vec![
            BoundsRecord::new(2, "P2", 1.0, 0.0, 2.0, 1.0),
            BoundsRecord::new(3, "P1", 0.0, 0.0, 1.0, 1.0),
            BoundsRecord::new(4, "P3", 2.0, 0.0, 3.0, 1.0),
        ];
        load(records, GridOptions::default()).unwrap().grid
    }

    fn record(pentad: &str, a: Option<f64>, b: Option<f64>) -> AggregateRecord {
        AggregateRecord {
            pentad: pentad.to_string(),
            values: vec![
                ColumnValue {
                    column: "X_A".to_string(),
                    mean: a,
                },
                ColumnValue {
                    column: "X_B".to_string(),
                    mean: b,
                },
            ],
            samples: 4,
            effective_scale: Some(100.0),
        }
    }

    #[test]
    fn test_rows_follow_grid_order() {
        let mut set = AggregateSet::new("X", vec!["X_A".to_string(), "X_B".to_string()]);
        set.insert("P1", Ok(record("P1", Some(1.0), Some(2.0))));
        set.insert("P2", Ok(record("P2", None, Some(4.0))));
        set.insert(
            "P3",
            Err(PentadError::Timeout {
                pentad: "P3".to_string(),
                source_name: "X".to_string(),
                after_ms: 5,
            }),
        );

        let table = ExportPlanner::plan(&grid(), &set).unwrap();
        assert_eq!(table.name, "mean_values_X");
        assert_eq!(table.header(), vec!["pentad", "X_A", "X_B"]);

        let pentads: Vec<&str> = table.rows.iter().map(|r| r.pentad.as_str()).collect();
        assert_eq!(pentads, vec!["P2", "P1", "P3"]);
        assert_eq!(table.rows[0].values, vec![None, Some(4.0)]);
        assert_eq!(table.rows[1].values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(table.rows[2].values, vec![None, None]);
    }

    #[test]
    fn test_absent_cells_are_missing() {
        let set = AggregateSet::new("Y", vec!["Y".to_string()]);
        let table = ExportPlanner::plan(&grid(), &set).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.rows.iter().all(|r| r.values == vec![None]));
    }
}
