//! Generic record extraction driven by a [`SupplierConfig`].
//!
//! One pass over the chosen sheet yields both outputs of a cycle:
//!
//! - `records`: the diff input, one record per data row with a usable id;
//! - `availability`: records admitted by the supplier's stock policy, with
//!   mirrored identifiers synthesised next to their originals.
//!
//! Sheet choice: the supplier's preferred sheet when the workbook has it,
//! otherwise the sheet yielding the most non-empty codes under its detected
//! (or fallback) schema. Legend and cover sheets lose that count.

use thiserror::Error;
use tracing::debug;

use crate::cell::{Cell, Sheet, Workbook};
use crate::locate::{ColumnMap, HeaderMatch, locate_columns};
use crate::normalize::{classify_stock, parse_price};
use crate::record::Record;
use crate::supplier::{Layout, Positions, SupplierConfig};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("workbook has no sheets")]
    NoSheets,

    #[error("no records found (best sheet '{sheet}')")]
    NoRecords { sheet: String },
}

/// Where the data of a sheet lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSchema {
    /// The detected header, or `None` when fallback positions are in use.
    pub header: Option<HeaderMatch>,
    pub columns: ColumnMap,
    /// 0-based first data row.
    pub data_start: usize,
}

impl SheetSchema {
    /// Detect the header of `sheet`, falling back to fixed `positions`.
    pub fn detect(sheet: &Sheet, positions: &Positions, max_scan_rows: usize) -> Self {
        match locate_columns(sheet, max_scan_rows) {
            Some(header) => Self {
                header: Some(header),
                columns: header.columns,
                data_start: header.data_start(),
            },
            None => Self {
                header: None,
                columns: positions.columns(),
                data_start: positions.data_start(),
            },
        }
    }

    /// Number of data rows with a non-empty code.
    pub fn code_count(&self, sheet: &Sheet) -> usize {
        sheet
            .rows_between(self.data_start, sheet.max_row())
            .filter(|(_, row)| !cell_at(row, Some(self.columns.code)).to_text().is_empty())
            .count()
    }
}

/// Result of extracting one supplier file.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub sheet: String,
    pub schema: SheetSchema,
    pub records: Vec<Record>,
    pub availability: Vec<Record>,
}

/// Extract records and the availability table from `workbook`.
pub fn extract(workbook: &Workbook, supplier: &SupplierConfig) -> Result<Extraction, ExtractError> {
    let (sheet, schema) = select_sheet(workbook, &supplier.layout)?;

    let mut records = Vec::new();
    let mut availability = Vec::new();

    for (_, row) in sheet.rows_between(schema.data_start, sheet.max_row()) {
        let raw_code = cell_at(row, Some(schema.columns.code)).to_text();
        if raw_code.is_empty() {
            continue;
        }
        let id = supplier.canonical_id(&raw_code);

        let raw_stock = cell_at(row, schema.columns.stock);
        let price = parse_price(cell_at(row, schema.columns.price));
        let currency = Some(cell_at(row, schema.columns.currency).to_text()).filter(|c| !c.is_empty());
        let stock_level = classify_stock(raw_stock);

        let Some(record) = Record::new(&id, price, currency, stock_level) else {
            continue;
        };

        if supplier.stock_policy.admits(raw_stock) {
            let mirror = supplier.mirrored_id(&record.id);
            availability.push(record.clone());
            if let Some(alt) = mirror {
                availability.push(record.with_id(alt));
            }
        }
        records.push(record);
    }

    debug!(
        supplier = %supplier.id,
        sheet = sheet.name(),
        header_row = ?schema.header.map(|h| h.header_row),
        records = records.len(),
        available = availability.len(),
        "extracted supplier sheet"
    );

    if records.is_empty() {
        return Err(ExtractError::NoRecords {
            sheet: sheet.name().to_string(),
        });
    }

    Ok(Extraction {
        sheet: sheet.name().to_string(),
        schema,
        records,
        availability,
    })
}

/// Pick the sheet to extract and its schema.
pub fn select_sheet<'a>(
    workbook: &'a Workbook,
    layout: &Layout,
) -> Result<(&'a Sheet, SheetSchema), ExtractError> {
    if let Some((sheet, preferred)) = layout
        .preferred_sheet
        .as_ref()
        .and_then(|p| workbook.sheet(&p.name).map(|sheet| (sheet, p)))
    {
        let schema = SheetSchema::detect(sheet, &preferred.positions, layout.max_scan_rows);
        return Ok((sheet, schema));
    }

    let mut best: Option<(&Sheet, SheetSchema, usize)> = None;
    for sheet in workbook.sheets() {
        let schema = SheetSchema::detect(sheet, &layout.fallback, layout.max_scan_rows);
        let count = schema.code_count(sheet);
        debug!(sheet = sheet.name(), codes = count, "evaluated sheet");
        if best.as_ref().is_none_or(|(_, _, best_count)| count > *best_count) {
            best = Some((sheet, schema, count));
        }
    }

    best.map(|(sheet, schema, _)| (sheet, schema))
        .ok_or(ExtractError::NoSheets)
}

fn cell_at(row: &[Cell], col: Option<usize>) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    col.and_then(|c| row.get(c)).unwrap_or(&EMPTY)
}
