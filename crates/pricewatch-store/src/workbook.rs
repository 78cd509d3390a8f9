//! Spreadsheet adapter: loads `.xlsx`, `.xls` and `.ods` files through calamine.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use pricewatch_core::{Cell, Sheet, Workbook, WorkbookError, WorkbookReader};
use tracing::debug;

/// [`WorkbookReader`] backed by calamine.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl WorkbookReader for CalamineReader {
    fn open(&self, path: &Path) -> Result<Workbook, WorkbookError> {
        let mut book = open_workbook_auto(path).map_err(|e| WorkbookError::Open {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let mut sheets = Vec::new();
        for name in book.sheet_names() {
            let range = book
                .worksheet_range(&name)
                .map_err(|e| WorkbookError::Sheet {
                    sheet: name.clone(),
                    source: Box::new(e),
                })?;
            sheets.push(Sheet::new(name, grid(&range)));
        }

        if sheets.is_empty() {
            return Err(WorkbookError::NoSheets(path.to_path_buf()));
        }
        debug!(path = %path.display(), sheets = sheets.len(), "workbook loaded");
        Ok(Workbook::new(sheets))
    }
}

/// Dense grid with every cell at its absolute position. calamine ranges start
/// at the first used cell, so leading rows and columns are padded.
fn grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((row0, col0)) = range.start() else {
        return Vec::new();
    };
    let (row0, col0) = (row0 as usize, col0 as usize);

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0];
    for row in range.rows() {
        let mut out = vec![Cell::Empty; col0];
        out.extend(row.iter().map(to_cell));
        rows.push(out);
    }
    rows
}

fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
    }
}
