//! In-memory export tables and their CSV encoding.

use pentad_common::PENTAD_COLUMN;

use crate::error::{ExportError, Result};

/// One row of an export: a pentad and one value per data column.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub pentad: String,
    pub values: Vec<Option<f64>>,
}

/// A named table: `pentad` followed by data columns, one row per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    /// Table name, also the object name without extension.
    pub name: String,
    /// Data column names, in output order. The pentad column is implicit.
    pub columns: Vec<String>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Its width must match the data columns.
    pub fn push_row(&mut self, pentad: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let pentad = pentad.into();
        if values.len() != self.columns.len() {
            return Err(ExportError::RowWidth {
                table: self.name.clone(),
                pentad,
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        self.rows.push(ExportRow { pentad, values });
        Ok(())
    }

    /// Header including the pentad column.
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(PENTAD_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a value by pentad and column name.
    pub fn value(&self, pentad: &str, column: &str) -> Option<f64> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|row| row.pentad == pentad)
            .and_then(|row| row.values[index])
    }

    /// Object file name: `<name>.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    /// Encode as CSV. Numbers use `f64` `Display`; missing values and
    /// non-finite numbers are empty fields.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.header())?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.pentad.clone());
            record.extend(row.values.iter().map(|v| format_value(*v)));
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.to_string()))
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}
