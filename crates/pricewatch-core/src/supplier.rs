//! Per-supplier extraction policy.
//!
//! Every supplier is described by data, not code: a fixed-position fallback
//! layout for sheets without a recognisable header, a stock-inclusion rule for
//! the availability table, and two identifier rewrites (F/T mirroring and
//! branch-prefix truncation). The generic extractor in [`crate::extract`]
//! interprets this value.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::locate::{ColumnMap, DEFAULT_MAX_SCAN_ROWS};
use crate::normalize::{
    MORE_THAN_FIVE_PHRASES, NO_STOCK_PHRASES, POSITIVE_PHRASES, matches_phrase, stock_quantity,
};

/// Prefix pair swapped by identifier mirroring.
pub const MIRROR_PREFIXES: (char, char) = ('F', 'T');

/// Fixed positions used when no header row is found.
///
/// Rows and columns are 1-based, as they appear in the supplier's file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Positions {
    pub start_row: usize,
    pub code_column: usize,
    pub stock_column: Option<usize>,
    pub price_column: Option<usize>,
    pub currency_column: Option<usize>,
}

impl Default for Positions {
    fn default() -> Self {
        Self {
            start_row: 2,
            code_column: 1,
            stock_column: None,
            price_column: None,
            currency_column: None,
        }
    }
}

impl Positions {
    /// 0-based index of the first data row.
    pub fn data_start(&self) -> usize {
        self.start_row.saturating_sub(1)
    }

    /// 0-based column map.
    pub fn columns(&self) -> ColumnMap {
        let zero_based = |c: usize| c.saturating_sub(1);
        ColumnMap {
            code: zero_based(self.code_column),
            stock: self.stock_column.map(zero_based),
            price: self.price_column.map(zero_based),
            currency: self.currency_column.map(zero_based),
        }
    }
}

/// A sheet used in preference to best-sheet selection, with the fixed
/// positions that apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredSheet {
    pub name: String,
    #[serde(flatten)]
    pub positions: Positions,
}

/// How to find a supplier's data in a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Positions for any sheet other than the preferred one.
    #[serde(flatten)]
    pub fallback: Positions,
    pub preferred_sheet: Option<PreferredSheet>,
    pub max_scan_rows: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            fallback: Positions::default(),
            preferred_sheet: None,
            max_scan_rows: DEFAULT_MAX_SCAN_ROWS,
        }
    }
}

/// Rule deciding whether a record appears in the availability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockPolicy {
    /// Publish every record regardless of stock.
    All,
    /// "More than five" phrases, or a quantity of at least `min_units`.
    Threshold { min_units: f64 },
    /// Only explicit availability phrases; bare quantities never qualify.
    TextOnly,
    /// Any positive quantity, or an availability phrase.
    PositiveNumeric,
}

impl StockPolicy {
    /// Whether a raw stock cell admits the record.
    pub fn admits(&self, raw: &Cell) -> bool {
        match self {
            Self::All => true,
            Self::Threshold { min_units } => {
                if matches_phrase(raw, NO_STOCK_PHRASES) {
                    return false;
                }
                if matches_phrase(raw, MORE_THAN_FIVE_PHRASES) {
                    return true;
                }
                stock_quantity(raw).is_some_and(|n| n > 0.0 && n >= *min_units)
            }
            Self::TextOnly => matches_phrase(raw, POSITIVE_PHRASES),
            Self::PositiveNumeric => {
                stock_quantity(raw).is_some_and(|n| n > 0.0)
                    || matches_phrase(raw, POSITIVE_PHRASES)
            }
        }
    }
}

/// Full extraction configuration for one supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub id: String,
    #[serde(default)]
    pub layout: Layout,
    pub stock_policy: StockPolicy,
    /// Publish `F…` codes also as `T…` and vice versa.
    #[serde(default)]
    pub mirror_ids: bool,
    /// Keep only the part after the last `-` when a code has two or more.
    #[serde(default)]
    pub truncate_ids: bool,
}

impl SupplierConfig {
    /// Canonical id for a raw code under this supplier's rules.
    pub fn canonical_id(&self, raw: &str) -> String {
        let raw = raw.trim();
        if self.truncate_ids {
            truncate_branch_prefix(raw).to_string()
        } else {
            raw.to_string()
        }
    }

    /// Alternate code for a mirrored item, if this supplier mirrors `id`.
    pub fn mirrored_id(&self, id: &str) -> Option<String> {
        if self.mirror_ids { mirror_id(id) } else { None }
    }

    /// The four suppliers the pipeline was built for.
    pub fn defaults() -> Vec<SupplierConfig> {
        vec![
            SupplierConfig {
                id: "Tevelam".into(),
                layout: Layout {
                    fallback: Positions {
                        start_row: 11,
                        stock_column: Some(9),
                        ..Positions::default()
                    },
                    ..Layout::default()
                },
                stock_policy: StockPolicy::Threshold { min_units: 5.0 },
                mirror_ids: true,
                truncate_ids: false,
            },
            SupplierConfig {
                id: "Disco_Pro".into(),
                layout: Layout {
                    fallback: Positions {
                        start_row: 9,
                        stock_column: Some(7),
                        ..Positions::default()
                    },
                    ..Layout::default()
                },
                stock_policy: StockPolicy::Threshold { min_units: 5.0 },
                mirror_ids: true,
                truncate_ids: false,
            },
            SupplierConfig {
                id: "ARS_Tech".into(),
                // Code in B and stock in D on the STOCK sheet; any other
                // sheet keeps codes in A and stock in H.
                layout: Layout {
                    fallback: Positions {
                        start_row: 2,
                        stock_column: Some(8),
                        ..Positions::default()
                    },
                    preferred_sheet: Some(PreferredSheet {
                        name: "STOCK".into(),
                        positions: Positions {
                            start_row: 2,
                            code_column: 2,
                            stock_column: Some(4),
                            ..Positions::default()
                        },
                    }),
                    ..Layout::default()
                },
                stock_policy: StockPolicy::PositiveNumeric,
                mirror_ids: false,
                truncate_ids: false,
            },
            SupplierConfig {
                id: "IMSA".into(),
                layout: Layout {
                    fallback: Positions {
                        start_row: 8,
                        stock_column: Some(8),
                        ..Positions::default()
                    },
                    ..Layout::default()
                },
                stock_policy: StockPolicy::TextOnly,
                mirror_ids: false,
                truncate_ids: true,
            },
        ]
    }
}

/// Swap a leading `F` for `T` (or `T` for `F`); codes shorter than two
/// characters are never mirrored.
pub fn mirror_id(id: &str) -> Option<String> {
    let (a, b) = MIRROR_PREFIXES;
    let mut chars = id.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    if rest.is_empty() {
        return None;
    }
    if first == a {
        Some(format!("{b}{rest}"))
    } else if first == b {
        Some(format!("{a}{rest}"))
    } else {
        None
    }
}

/// `"SUC-01-AB123"` → `"AB123"`; codes with fewer than two hyphens are kept.
pub fn truncate_branch_prefix(code: &str) -> &str {
    if code.matches('-').count() >= 2 {
        code.rsplit('-').next().unwrap_or(code)
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_policy() {
        let p = StockPolicy::Threshold { min_units: 5.0 };
        assert!(p.admits(&Cell::from("Mayor a 5")));
        assert!(p.admits(&Cell::from(">5")));
        assert!(p.admits(&Cell::Number(5.0)));
        assert!(p.admits(&Cell::from("12")));
        assert!(!p.admits(&Cell::from("Sin stock")));
        assert!(!p.admits(&Cell::Number(0.0)));
        assert!(!p.admits(&Cell::Number(3.0)));
        assert!(!p.admits(&Cell::from("Menor a 5")));
        assert!(!p.admits(&Cell::Empty));
    }

    #[test]
    fn threshold_zero_never_admits_empty_stock() {
        let p = StockPolicy::Threshold { min_units: 0.0 };
        assert!(!p.admits(&Cell::Number(0.0)));
        assert!(p.admits(&Cell::Number(1.0)));
    }

    #[test]
    fn text_only_policy_ignores_quantities() {
        let p = StockPolicy::TextOnly;
        assert!(p.admits(&Cell::from("En stock")));
        assert!(p.admits(&Cell::from("Disponible")));
        assert!(!p.admits(&Cell::Number(3.0)));
        assert!(!p.admits(&Cell::Number(50.0)));
        assert!(!p.admits(&Cell::from("Sin stock")));
    }

    #[test]
    fn positive_numeric_policy() {
        let p = StockPolicy::PositiveNumeric;
        assert!(p.admits(&Cell::Number(1.0)));
        assert!(p.admits(&Cell::from("3")));
        assert!(p.admits(&Cell::from("con stock")));
        assert!(!p.admits(&Cell::Number(0.0)));
        assert!(!p.admits(&Cell::from("agotado")));
    }

    #[test]
    fn all_policy_admits_everything() {
        assert!(StockPolicy::All.admits(&Cell::Empty));
        assert!(StockPolicy::All.admits(&Cell::from("Sin stock")));
    }

    #[test]
    fn mirroring_swaps_prefix() {
        assert_eq!(mirror_id("F123").as_deref(), Some("T123"));
        assert_eq!(mirror_id("T123").as_deref(), Some("F123"));
        assert_eq!(mirror_id("X123"), None);
        assert_eq!(mirror_id("F"), None);
        assert_eq!(mirror_id("f123"), None);
        assert_eq!(mirror_id(""), None);
    }

    #[test]
    fn truncation_keeps_last_segment() {
        assert_eq!(truncate_branch_prefix("SUC-01-AB123"), "AB123");
        assert_eq!(truncate_branch_prefix("A-B-C-D"), "D");
        assert_eq!(truncate_branch_prefix("AB-123"), "AB-123");
        assert_eq!(truncate_branch_prefix("AB123"), "AB123");
    }

    #[test]
    fn canonical_id_respects_flags() {
        let mut cfg = SupplierConfig::defaults().remove(3);
        assert_eq!(cfg.canonical_id(" X-Y-Z9 "), "Z9");
        cfg.truncate_ids = false;
        assert_eq!(cfg.canonical_id(" X-Y-Z9 "), "X-Y-Z9");
    }

    #[test]
    fn fallback_columns_are_zero_based() {
        let positions = Positions {
            start_row: 11,
            code_column: 1,
            stock_column: Some(9),
            ..Positions::default()
        };
        assert_eq!(positions.data_start(), 10);
        let cols = positions.columns();
        assert_eq!(cols.code, 0);
        assert_eq!(cols.stock, Some(8));
        assert_eq!(cols.price, None);
    }

    #[test]
    fn config_json_roundtrip() {
        let json = r#"{
            "id": "Acme",
            "layout": { "start_row": 4, "stock_column": 3 },
            "stock_policy": { "kind": "threshold", "min_units": 10 },
            "mirror_ids": true
        }"#;
        let cfg: SupplierConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.layout.fallback.start_row, 4);
        assert_eq!(cfg.layout.fallback.code_column, 1);
        assert_eq!(cfg.layout.preferred_sheet, None);
        assert_eq!(cfg.layout.max_scan_rows, DEFAULT_MAX_SCAN_ROWS);
        assert_eq!(cfg.stock_policy, StockPolicy::Threshold { min_units: 10.0 });
        assert!(cfg.mirror_ids);
        assert!(!cfg.truncate_ids);
    }

    #[test]
    fn preferred_sheet_json_carries_its_positions() {
        let json = r#"{
            "id": "Acme",
            "layout": {
                "stock_column": 8,
                "preferred_sheet": { "name": "STOCK", "code_column": 2, "stock_column": 4 }
            },
            "stock_policy": { "kind": "all" }
        }"#;
        let cfg: SupplierConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.layout.fallback.code_column, 1);
        assert_eq!(cfg.layout.fallback.stock_column, Some(8));
        let preferred = cfg.layout.preferred_sheet.unwrap();
        assert_eq!(preferred.name, "STOCK");
        assert_eq!(preferred.positions.start_row, 2);
        assert_eq!(preferred.positions.code_column, 2);
        assert_eq!(preferred.positions.stock_column, Some(4));
    }

    #[test]
    fn defaults_have_unique_ids() {
        let defaults = SupplierConfig::defaults();
        let mut ids: Vec<&str> = defaults.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), defaults.len());
    }
}
