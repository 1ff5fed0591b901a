//! Aggregation results.

use std::collections::{BTreeMap, HashMap};

use pentad_common::{ErrorKind, PentadError, PentadResult};

/// Mean of one output column for one cell. `None` means missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: String,
    pub mean: Option<f64>,
}

/// Per-cell result for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub pentad: String,
    /// Values in output column order.
    pub values: Vec<ColumnValue>,
    /// Sample points inside the raster (0 when the cell misses the raster).
    pub samples: u64,
    /// Scale in metres actually used, if any sampling happened.
    pub effective_scale: Option<f64>,
}

impl AggregateRecord {
    /// A record with every column missing.
    pub fn missing(pentad: impl Into<String>, columns: &[String]) -> Self {
        Self {
            pentad: pentad.into(),
            values: columns
                .iter()
                .map(|column| ColumnValue {
                    column: column.clone(),
                    mean: None,
                })
                .collect(),
            samples: 0,
            effective_scale: None,
        }
    }

    /// Value of a column; `None` if missing or not a column of this record.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.column == column)
            .and_then(|v| v.mean)
    }

    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(|v| v.mean.is_none())
    }
}

/// Outcome of one cell: a record, or the per-cell error that replaced it.
pub type CellOutcome = PentadResult<AggregateRecord>;

/// All cell outcomes of one source, keyed by pentad.
#[derive(Debug, Clone, Default)]
pub struct AggregateSet {
    pub source_name: String,
    /// Output columns in order.
    pub columns: Vec<String>,
    outcomes: HashMap<String, CellOutcome>,
}

impl AggregateSet {
    pub fn new(source_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            source_name: source_name.into(),
            columns,
            outcomes: HashMap::new(),
        }
    }

    /// Store the outcome of a cell. Each pentad is written at most once;
    /// a second write is ignored and returns `false`.
    pub fn insert(&mut self, pentad: impl Into<String>, outcome: CellOutcome) -> bool {
        let pentad = pentad.into();
        if self.outcomes.contains_key(&pentad) {
            tracing::warn!(
                source = %self.source_name,
                pentad = %pentad,
                "Ignoring second result for cell"
            );
            return false;
        }
        self.outcomes.insert(pentad, outcome);
        true
    }

    pub fn get(&self, pentad: &str) -> Option<&CellOutcome> {
        self.outcomes.get(pentad)
    }

    /// Successful record for a pentad.
    pub fn record(&self, pentad: &str) -> Option<&AggregateRecord> {
        self.outcomes.get(pentad).and_then(|o| o.as_ref().ok())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Cells whose outcome is an error.
    pub fn degraded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_err()).count()
    }

    /// Errors grouped by kind.
    pub fn error_counts(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for err in self.errors() {
            *counts.entry(err.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn errors(&self) -> impl Iterator<Item = &PentadError> {
        self.outcomes.values().filter_map(|o| o.as_ref().err())
    }
}
