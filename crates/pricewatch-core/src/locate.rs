//! Header detection: find which column holds which field in a schemaless sheet.
//!
//! Rows are scanned top to bottom within a bounded window. Every cell is
//! normalized (see [`normalize_text`](crate::normalize::normalize_text)) and
//! compared against four fixed keyword sets. The first row in which a code
//! column appears is the header row; stock, price and currency columns are
//! optional and taken from that same row, first match per field, left to
//! right.

use crate::cell::Sheet;
use crate::normalize::normalize_cell;

/// Default number of leading rows inspected for a header.
pub const DEFAULT_MAX_SCAN_ROWS: usize = 60;

const CODE_KEYWORDS: &[&str] = &["codigo", "cod", "id", "articulo", "sku", "modelo"];
const STOCK_KEYWORDS: &[&str] = &["stock", "estado", "disponibilidad", "disponible"];
const PRICE_KEYWORDS: &[&str] = &["precio", "p. lista", "p lista", "plista", "lista", "price", "valor"];
const CURRENCY_KEYWORDS: &[&str] = &["moneda", "currency", "divisa"];

/// 0-based column positions of the semantic fields in a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub code: usize,
    pub stock: Option<usize>,
    pub price: Option<usize>,
    pub currency: Option<usize>,
}

/// A detected header: its 0-based row and the columns it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub header_row: usize,
    pub columns: ColumnMap,
}

impl HeaderMatch {
    /// First data row under the header.
    pub fn data_start(&self) -> usize {
        self.header_row + 1
    }
}

#[derive(Default)]
struct Candidate {
    code: Option<usize>,
    stock: Option<usize>,
    price: Option<usize>,
    currency: Option<usize>,
}

/// Locate the header row and field columns of `sheet`.
///
/// Returns `None` when no row among the first `max_scan_rows` names a code
/// column; callers then fall back to fixed positions.
pub fn locate_columns(sheet: &Sheet, max_scan_rows: usize) -> Option<HeaderMatch> {
    for (row_idx, row) in sheet.rows_between(0, max_scan_rows) {
        let mut cand = Candidate::default();

        for (col_idx, cell) in row.iter().enumerate() {
            let header = normalize_cell(cell);
            if header.is_empty() {
                continue;
            }
            let h = header.as_str();
            // A cell feeds at most one field: code, then price, currency, stock.
            if cand.code.is_none() && CODE_KEYWORDS.contains(&h) {
                cand.code = Some(col_idx);
            } else if cand.price.is_none() && PRICE_KEYWORDS.contains(&h) {
                cand.price = Some(col_idx);
            } else if cand.currency.is_none() && CURRENCY_KEYWORDS.contains(&h) {
                cand.currency = Some(col_idx);
            } else if cand.stock.is_none() && STOCK_KEYWORDS.contains(&h) {
                cand.stock = Some(col_idx);
            }
        }

        if let Some(code) = cand.code {
            return Some(HeaderMatch {
                header_row: row_idx,
                columns: ColumnMap {
                    code,
                    stock: cand.stock,
                    price: cand.price,
                    currency: cand.currency,
                },
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            "S",
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|s| if s.is_empty() { Cell::Empty } else { Cell::from(*s) })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn finds_header_below_banner_rows() {
        let s = sheet(&[
            &["LISTA DE PRECIOS OCTUBRE"],
            &[""],
            &["Código", "Descripción", "Precio", "Moneda", "Stock"],
            &["A1", "Widget", "10", "USD", "Mayor a 5"],
        ]);
        let m = locate_columns(&s, DEFAULT_MAX_SCAN_ROWS).unwrap();
        assert_eq!(m.header_row, 2);
        assert_eq!(m.data_start(), 3);
        assert_eq!(
            m.columns,
            ColumnMap {
                code: 0,
                stock: Some(4),
                price: Some(2),
                currency: Some(3),
            }
        );
    }

    #[test]
    fn banner_with_price_keyword_does_not_qualify() {
        // "lista" alone is a price keyword; no code column, so keep scanning.
        let s = sheet(&[&["Lista"], &["SKU", "Valor"]]);
        let m = locate_columns(&s, DEFAULT_MAX_SCAN_ROWS).unwrap();
        assert_eq!(m.header_row, 1);
        assert_eq!(m.columns.price, Some(1));
    }

    #[test]
    fn first_match_per_field_wins() {
        let s = sheet(&[&["Modelo", "Precio", "Codigo", "P. Lista", "Estado", "Stock"]]);
        let m = locate_columns(&s, DEFAULT_MAX_SCAN_ROWS).unwrap();
        assert_eq!(m.columns.code, 0);
        assert_eq!(m.columns.price, Some(1));
        assert_eq!(m.columns.stock, Some(4));
        assert_eq!(m.columns.currency, None);
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let s = sheet(&[&["", "ID"]]);
        let m = locate_columns(&s, DEFAULT_MAX_SCAN_ROWS).unwrap();
        assert_eq!(m.columns.code, 1);
        assert_eq!(m.columns.stock, None);
    }

    #[test]
    fn scan_window_is_bounded() {
        let filler: &[&str] = &["x"];
        let header: &[&str] = &["Codigo"];
        let rows = [filler, filler, filler, filler, filler, header];
        let s = sheet(&rows);
        assert!(locate_columns(&s, 5).is_none());
        assert_eq!(locate_columns(&s, 6).unwrap().header_row, 5);
    }

    #[test]
    fn no_header_yields_none() {
        let s = sheet(&[&["A1", "10"], &["B2", "20"]]);
        assert!(locate_columns(&s, DEFAULT_MAX_SCAN_ROWS).is_none());
    }
}
