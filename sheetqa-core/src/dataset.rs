//! In-memory tabular dataset loaded from a spreadsheet.
//!
//! A [`Dataset`] is an ordered sequence of named columns with a uniform row
//! count and a per-column inferred scalar type. It is loaded once per file,
//! immutable for the duration of a question/answer cycle, and replaced
//! wholesale when a new file is loaded.
//!
//! Supported formats: CSV via the `csv` crate; XLSX/XLS/ODS via `calamine`
//! (first sheet only, first row treated as the header).

use calamine::{Data, Reader, open_workbook_auto};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::DataError;

/// Maximum number of rows imported from a file. Rows past the cap are dropped
/// with a warning rather than failing the load.
const MAX_ROWS: usize = 100_000;

/// Maximum number of columns imported from a file.
const MAX_COLS: usize = 256;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Parse a raw text field into the narrowest matching value.
    ///
    /// Numbers and booleans are recognized; everything else stays text.
    /// Whitespace-only fields are empty.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return CellValue::Number(n);
        }
        match trimmed {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => {
                // Render integral floats without the trailing ".0".
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Empty => Ok(()),
        }
    }
}

/// The inferred scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Bool,
}

/// An immutable, in-memory table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    kinds: Vec<ColumnType>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from a header and rows, inferring column types.
    ///
    /// Rows shorter than the header are padded with empty cells. Rows longer
    /// than the header are rejected.
    pub fn from_rows(
        columns: Vec<String>,
        mut rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, DataError> {
        if columns.is_empty() {
            return Err(DataError::MissingHeader);
        }
        let width = columns.len();
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() > width {
                return Err(DataError::RaggedRow {
                    row: i + 1,
                    found: row.len(),
                    expected: width,
                });
            }
            while row.len() < width {
                row.push(CellValue::Empty);
            }
        }
        let kinds = infer_column_types(width, &rows);
        Ok(Self {
            columns,
            kinds,
            rows,
        })
    }

    /// Load a dataset from a file path, dispatching on the extension.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Self::from_csv(path),
            "xlsx" | "xls" | "xlsb" | "ods" => Self::from_workbook(path),
            other => Err(DataError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Load from a CSV file. The first record is the header.
    pub fn from_csv(path: &Path) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| DataError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .iter()
            .take(MAX_COLS)
            .map(|h| h.trim().to_string())
            .collect();
        if columns.is_empty() {
            return Err(DataError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            if rows.len() >= MAX_ROWS {
                warn!(max = MAX_ROWS, "Row cap reached, dropping remaining rows");
                break;
            }
            rows.push(
                record
                    .iter()
                    .take(MAX_COLS)
                    .map(CellValue::infer)
                    .collect(),
            );
        }

        debug!(rows = rows.len(), cols = columns.len(), "Loaded CSV");
        Self::from_rows(columns, rows)
    }

    /// Load from an Excel/ODS workbook. Only the first sheet is read.
    pub fn from_workbook(path: &Path) -> Result<Self, DataError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| DataError::OpenFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(DataError::NoSheets)?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| DataError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut row_iter = range.rows();
        let header = row_iter.next().ok_or(DataError::MissingHeader)?;
        let columns: Vec<String> = header
            .iter()
            .take(MAX_COLS)
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(DataError::MissingHeader);
        }

        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for row in row_iter {
            if rows.len() >= MAX_ROWS {
                warn!(max = MAX_ROWS, "Row cap reached, dropping remaining rows");
                break;
            }
            let cells: Vec<CellValue> = row.iter().take(MAX_COLS).map(cell_from_data).collect();
            rows.push(cells);
        }

        // Drop trailing all-empty rows left behind by formatting.
        while rows
            .last()
            .is_some_and(|r| r.iter().all(CellValue::is_empty))
        {
            rows.pop();
        }

        debug!(
            sheet = sheet_name.as_str(),
            rows = rows.len(),
            cols = columns.len(),
            "Loaded workbook sheet"
        );
        Self::from_rows(columns, rows)
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Inferred column types, parallel to [`columns`](Self::columns).
    pub fn column_types(&self) -> &[ColumnType] {
        &self.kinds
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of a column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// A copy of the first `n` rows, for preview display.
    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// A new dataset containing only the rows at the given indices.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Convert a calamine cell into our value model.
///
/// Dates come back as Excel serials; ISO datetime strings stay text.
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

/// Infer each column's type as the dominant non-empty cell kind.
///
/// Mixed columns and all-empty columns fall back to text.
fn infer_column_types(width: usize, rows: &[Vec<CellValue>]) -> Vec<ColumnType> {
    (0..width)
        .map(|col| {
            let mut numbers = 0usize;
            let mut bools = 0usize;
            let mut texts = 0usize;
            for row in rows {
                match &row[col] {
                    CellValue::Number(_) => numbers += 1,
                    CellValue::Bool(_) => bools += 1,
                    CellValue::Text(_) => texts += 1,
                    CellValue::Empty => {}
                }
            }
            if numbers > 0 && texts == 0 && bools == 0 {
                ColumnType::Number
            } else if bools > 0 && texts == 0 && numbers == 0 {
                ColumnType::Bool
            } else {
                ColumnType::Text
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sales_dataset() -> Dataset {
        let columns = vec![
            "Category".to_string(),
            "Product".to_string(),
            "Price".to_string(),
        ];
        let rows = vec![
            vec![
                CellValue::Text("Electronics".into()),
                CellValue::Text("Phone".into()),
                CellValue::Number(599.0),
            ],
            vec![
                CellValue::Text("Electronics".into()),
                CellValue::Text("Laptop".into()),
                CellValue::Number(1299.0),
            ],
            vec![
                CellValue::Text("Furniture".into()),
                CellValue::Text("Desk".into()),
                CellValue::Number(250.0),
            ],
        ];
        Dataset::from_rows(columns, rows).unwrap()
    }

    // ── construction & inference ────────────────────────────────────

    #[test]
    fn test_from_rows_infers_column_types() {
        let ds = sales_dataset();
        assert_eq!(
            ds.column_types(),
            &[ColumnType::Text, ColumnType::Text, ColumnType::Number]
        );
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let ds = Dataset::from_rows(
            vec!["A".into(), "B".into()],
            vec![vec![CellValue::Number(1.0)]],
        )
        .unwrap();
        assert_eq!(ds.rows()[0][1], CellValue::Empty);
    }

    #[test]
    fn test_from_rows_rejects_long_rows() {
        let err = Dataset::from_rows(
            vec!["A".into()],
            vec![vec![CellValue::Number(1.0), CellValue::Number(2.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn test_from_rows_requires_header() {
        let err = Dataset::from_rows(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, DataError::MissingHeader));
    }

    #[test]
    fn test_mixed_column_falls_back_to_text() {
        let ds = Dataset::from_rows(
            vec!["A".into()],
            vec![
                vec![CellValue::Number(1.0)],
                vec![CellValue::Text("x".into())],
            ],
        )
        .unwrap();
        assert_eq!(ds.column_types(), &[ColumnType::Text]);
    }

    // ── cell inference ──────────────────────────────────────────────

    #[test]
    fn test_infer_number() {
        assert_eq!(CellValue::infer("42"), CellValue::Number(42.0));
        assert_eq!(CellValue::infer("-3.5"), CellValue::Number(-3.5));
    }

    #[test]
    fn test_infer_bool() {
        assert_eq!(CellValue::infer("true"), CellValue::Bool(true));
        assert_eq!(CellValue::infer("FALSE"), CellValue::Bool(false));
    }

    #[test]
    fn test_infer_text_and_empty() {
        assert_eq!(
            CellValue::infer("Electronics"),
            CellValue::Text("Electronics".into())
        );
        assert_eq!(CellValue::infer("   "), CellValue::Empty);
    }

    #[test]
    fn test_display_integral_number() {
        assert_eq!(CellValue::Number(250.0).to_string(), "250");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
    }

    // ── lookup & slicing ────────────────────────────────────────────

    #[test]
    fn test_column_index_is_exact_match() {
        let ds = sales_dataset();
        assert_eq!(ds.column_index("Category"), Some(0));
        assert_eq!(ds.column_index("category"), None);
    }

    #[test]
    fn test_head_limits_rows() {
        let ds = sales_dataset();
        assert_eq!(ds.head(2).row_count(), 2);
        assert_eq!(ds.head(99).row_count(), 3);
    }

    #[test]
    fn test_select_rows() {
        let ds = sales_dataset();
        let subset = ds.select_rows(&[0, 2]);
        assert_eq!(subset.row_count(), 2);
        assert_eq!(subset.rows()[1][1], CellValue::Text("Desk".into()));
    }

    // ── CSV loading ─────────────────────────────────────────────────

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Category,Price").unwrap();
        writeln!(file, "Electronics,599").unwrap();
        writeln!(file, "Furniture,250").unwrap();
        file.flush().unwrap();

        let ds = Dataset::from_csv(file.path()).unwrap();
        assert_eq!(ds.columns(), &["Category".to_string(), "Price".to_string()]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_types()[1], ColumnType::Number);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = Dataset::load(Path::new("data.pdf")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat { .. }));
    }
}
