//! In-memory spreadsheet model shared by the extractor and the reader adapters.
//!
//! A [`Workbook`] is an ordered list of [`Sheet`]s; the first sheet plays the
//! role of the "active" sheet. Sheets are dense grids addressed 0-based, so a
//! reader adapter must pad leading empty rows/columns to keep spreadsheet
//! coordinates stable (row 11 in the supplier's file is index 10 here).

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A single cell value as delivered by a spreadsheet reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Trimmed textual form of the cell; empty for [`Cell::Empty`].
    ///
    /// Integral numbers render without a fractional part, so a numeric
    /// product code `12345.0` reads back as `"12345"`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

static EMPTY: Cell = Cell::Empty;

/// A named, dense, row-major grid of cells.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows (the 0-based index one past the last row).
    pub fn max_row(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `(row, col)`; out-of-range positions read as [`Cell::Empty`].
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Iterate rows `start..min(end, max_row)` with their index.
    pub fn rows_between(&self, start: usize, end: usize) -> impl Iterator<Item = (usize, &[Cell])> {
        let end = end.min(self.rows.len());
        (start.min(end)..end).map(move |i| (i, self.rows[i].as_slice()))
    }
}

/// An opened spreadsheet file: sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("cannot open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cannot read sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("workbook {0} has no sheets")]
    NoSheets(PathBuf),
}

/// Port: turns a source file into a [`Workbook`].
pub trait WorkbookReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Workbook, WorkbookError>;
}
