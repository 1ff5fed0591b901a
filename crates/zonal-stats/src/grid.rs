//! Pentad grid construction from bounding-box records.

use std::collections::HashSet;
use std::io::Read;

use pentad_common::{BoundingBox, PentadError, PentadResult, PENTAD_COLUMN};
use serde::{Deserialize, Serialize};

/// How record bounds map onto rectangle axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// `x_*` bounds are horizontal, `y_*` bounds are vertical.
    #[default]
    AsLabeled,
    /// `y_*` bounds are horizontal, `x_*` bounds are vertical.
    Swapped,
}

/// Options for [`load`] and [`load_csv`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub axis_order: AxisOrder,
    /// Exclude malformed records instead of failing the whole load.
    pub skip_malformed: bool,
}

/// One input record: a pentad identifier and four bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsRecord {
    /// 1-based line number in the source, for error reporting.
    pub line: usize,
    pub pentad: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundsRecord {
    pub fn new(line: usize, pentad: impl Into<String>, x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            line,
            pentad: pentad.into(),
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }
}

/// A named grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub pentad: String,
    pub bbox: BoundingBox,
}

/// Cells in input order; pentad codes are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// A loaded grid together with the records excluded from it.
#[derive(Debug, Clone)]
pub struct GridLoad {
    pub grid: Grid,
    /// `MalformedGridRecord` errors for excluded records (only with `skip_malformed`).
    pub rejected: Vec<PentadError>,
}

/// Accumulates cells and applies the malformed-record policy.
struct GridBuilder {
    options: GridOptions,
    cells: Vec<Cell>,
    seen: HashSet<String>,
    rejected: Vec<PentadError>,
}

impl GridBuilder {
    fn new(options: GridOptions) -> Self {
        Self {
            options,
            cells: Vec::new(),
            seen: HashSet::new(),
            rejected: Vec::new(),
        }
    }

    /// Record a malformed line: an error in strict mode, a rejection otherwise.
    fn reject(&mut self, line: usize, pentad: Option<String>, reason: String) -> PentadResult<()> {
        let err = PentadError::MalformedGridRecord {
            line,
            pentad,
            reason,
        };
        if !self.options.skip_malformed {
            return Err(err);
        }
        tracing::warn!(error = %err, "Skipping malformed grid record");
        self.rejected.push(err);
        Ok(())
    }

    fn push(&mut self, record: BoundsRecord) -> PentadResult<()> {
        let pentad = record.pentad.trim().to_string();
        if pentad.is_empty() {
            return self.reject(record.line, None, "empty pentad identifier".to_string());
        }

        let labeled = BoundingBox::new(record.x_min, record.y_min, record.x_max, record.y_max);
        let bbox = match self.options.axis_order {
            AxisOrder::AsLabeled => labeled,
            AxisOrder::Swapped => labeled.transposed(),
        };
        if let Err(e) = bbox.validate() {
            return self.reject(record.line, Some(pentad), e.to_string());
        }

        if !self.seen.insert(pentad.clone()) {
            return self.reject(record.line, Some(pentad), "duplicate pentad identifier".to_string());
        }

        self.cells.push(Cell { pentad, bbox });
        Ok(())
    }

    fn finish(self) -> GridLoad {
        GridLoad {
            grid: Grid { cells: self.cells },
            rejected: self.rejected,
        }
    }
}

/// Build a grid from records, preserving input order.
///
/// Without `skip_malformed` the first malformed record fails the load.
pub fn load<I>(records: I, options: GridOptions) -> PentadResult<GridLoad>
where
    I: IntoIterator<Item = BoundsRecord>,
{
    let mut builder = GridBuilder::new(options);
    for record in records {
        builder.push(record)?;
    }
    Ok(builder.finish())
}

/// Column positions of the required headers.
struct HeaderIndex {
    pentad: usize,
    bounds: [usize; 4],
}

const BOUND_COLUMNS: [&str; 4] = ["x_min", "y_min", "x_max", "y_max"];

impl HeaderIndex {
    fn from_headers(headers: &csv::StringRecord) -> PentadResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
                .ok_or_else(|| PentadError::MalformedGridRecord {
                    line: 1,
                    pentad: None,
                    reason: format!("missing column '{}'", name),
                })
        };

        Ok(Self {
            pentad: find(PENTAD_COLUMN)?,
            bounds: [
                find(BOUND_COLUMNS[0])?,
                find(BOUND_COLUMNS[1])?,
                find(BOUND_COLUMNS[2])?,
                find(BOUND_COLUMNS[3])?,
            ],
        })
    }
}

/// Read a grid from CSV with the columns `pentad,x_min,y_min,x_max,y_max`.
///
/// Header names are matched case-insensitively and extra columns are
/// ignored. A missing header fails the load regardless of `skip_malformed`.
pub fn load_csv<R: Read>(reader: R, options: GridOptions) -> PentadResult<GridLoad> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PentadError::Config(format!("failed to read grid header: {}", e)))?
        .clone();
    let index = HeaderIndex::from_headers(&headers)?;

    let mut builder = GridBuilder::new(options);
    for (row, result) in csv_reader.records().enumerate() {
        // header is line 1
        let fallback_line = row + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                builder.reject(line, None, e.to_string())?;
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        let pentad = record.get(index.pentad).unwrap_or_default().to_string();
        match parse_bounds(&record, &index) {
            Ok([x_min, y_min, x_max, y_max]) => {
                builder.push(BoundsRecord::new(line, pentad, x_min, y_min, x_max, y_max))?
            }
            Err(reason) => {
                let pentad = (!pentad.is_empty()).then_some(pentad);
                builder.reject(line, pentad, reason)?
            }
        }
    }

    let load = builder.finish();
    tracing::info!(
        cells = load.grid.len(),
        rejected = load.rejected.len(),
        "Loaded pentad grid"
    );
    Ok(load)
}

/// Read a grid CSV file from disk.
pub fn load_csv_path(path: &std::path::Path, options: GridOptions) -> PentadResult<GridLoad> {
    let file = std::fs::File::open(path)
        .map_err(|e| PentadError::Config(format!("failed to open grid {}: {}", path.display(), e)))?;
    load_csv(std::io::BufReader::new(file), options)
}

fn parse_bounds(record: &csv::StringRecord, index: &HeaderIndex) -> Result<[f64; 4], String> {
    let mut values = [0.0f64; 4];
    for (slot, (&col, name)) in values.iter_mut().zip(index.bounds.iter().zip(BOUND_COLUMNS)) {
        let raw = record
            .get(col)
            .ok_or_else(|| format!("missing value for {}", name))?;
        *slot = raw
            .parse()
            .map_err(|_| format!("{} is not a number: '{}'", name, raw))?;
    }
    Ok(values)
}
