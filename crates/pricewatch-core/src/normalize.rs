//! Locale-aware value parsing for supplier cells.
//!
//! Supplier exports follow the Argentine number convention: `.` groups
//! thousands and `,` marks decimals. Free text is matched after
//! [`normalize_text`], which lowercases, trims and folds accented vowels.
//!
//! # Price convention
//!
//! - `"1.234,56"` → `1234.56`
//! - `"1234,5"` → `1234.5`
//! - `"1.234"` → `1234` (every `.` is a thousands separator, always)
//! - numeric cells pass through unchanged
//!
//! # Stock vocabulary
//!
//! Stock text maps onto three levels: none (0), low (2), high (6). Numeric
//! quantities map to low below 5 and high from 5 upward.

use crate::cell::Cell;
use crate::record::StockLevel;

/// Phrases meaning "out of stock".
pub const NO_STOCK_PHRASES: &[&str] = &[
    "sin stock",
    "sinstock",
    "sin-stock",
    "no",
    "0",
    "agotado",
    "sin",
    "out of stock",
];

/// Phrases meaning "a few units left".
pub const LOW_STOCK_PHRASES: &[&str] = &["menor a 5", "<5", "bajo", "consultar", "poco", "limitado"];

/// Phrases meaning "plenty of units".
pub const HIGH_STOCK_PHRASES: &[&str] = &[
    "mayor a 5",
    ">5",
    "alto",
    "con stock",
    "constock",
    "en stock",
    "stock",
    "disponible",
    "si",
];

/// Phrases stating "more than five units", used by threshold policies.
pub const MORE_THAN_FIVE_PHRASES: &[&str] = &["mayor a 5", ">5", "+5", "mas de 5"];

/// Phrases stating plain availability, used by text policies.
pub const POSITIVE_PHRASES: &[&str] = &[
    "con stock",
    "constock",
    "en stock",
    "hay stock",
    "disponible",
    "si",
    "in stock",
    "available",
];

/// Quantity from which a numeric stock value counts as high.
const HIGH_STOCK_UNITS: f64 = 5.0;

/// Lowercase, trim, and fold the accented vowels used in Spanish headers.
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

/// [`normalize_text`] applied to a cell's textual form.
pub fn normalize_cell(cell: &Cell) -> String {
    normalize_text(&cell.to_text())
}

/// Whether the normalized text of `cell` is one of `phrases`.
pub fn matches_phrase(cell: &Cell, phrases: &[&str]) -> bool {
    let text = normalize_cell(cell);
    !text.is_empty() && phrases.contains(&text.as_str())
}

/// Parse a price cell into a canonical amount.
///
/// Returns `None` for empty, boolean, or unparseable cells; never fails.
pub fn parse_price(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_price_str(s),
        _ => None,
    }
}

/// Parse price text using the `.` thousands / `,` decimal convention.
pub fn parse_price_str(s: &str) -> Option<f64> {
    let canonical = s.trim().replace('.', "").replace(',', ".");
    canonical.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric stock quantity, if the cell holds one.
///
/// Text is read with `,` as the decimal mark; `.` is left alone because stock
/// columns never carry thousands separators.
pub fn stock_quantity(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Generic tri-level stock classifier.
///
/// Vocabulary matches win over numeric interpretation. Unrecognised
/// non-numeric text is `None`, which callers must keep distinct from
/// [`StockLevel::None`]: unknown is not out of stock.
pub fn classify_stock(cell: &Cell) -> Option<StockLevel> {
    let text = normalize_cell(cell);
    if NO_STOCK_PHRASES.contains(&text.as_str()) {
        return Some(StockLevel::None);
    }
    if LOW_STOCK_PHRASES.contains(&text.as_str()) {
        return Some(StockLevel::Low);
    }
    if HIGH_STOCK_PHRASES.contains(&text.as_str()) {
        return Some(StockLevel::High);
    }
    let n = text
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())?;
    if n <= 0.0 {
        Some(StockLevel::None)
    } else if n >= HIGH_STOCK_UNITS {
        Some(StockLevel::High)
    } else {
        Some(StockLevel::Low)
    }
}
