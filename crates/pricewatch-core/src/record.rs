//! Extracted line items and the persisted price baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Derived availability category.
///
/// Serialised and rendered as the unit hints 0 / 2 / 6 the supplier sheets
/// have always been published with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    None,
    Low,
    High,
}

impl StockLevel {
    pub fn units(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Low => 2,
            Self::High => 6,
        }
    }
}

/// One supplier line item at a point in time.
///
/// `id` is the reconciliation key: case-sensitive and never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub stock_level: Option<StockLevel>,
}

impl Record {
    /// Build a record, returning `None` when the trimmed id is empty.
    pub fn new(
        id: &str,
        price: Option<f64>,
        currency: Option<String>,
        stock_level: Option<StockLevel>,
    ) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            price,
            currency,
            stock_level,
        })
    }

    /// Same item under another catalog code.
    pub fn with_id(&self, id: String) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Baseline value kept per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub price: Option<f64>,
    pub currency: Option<String>,
}

/// Last successfully diffed `id → (price, currency)` state of one supplier.
pub type Snapshot = BTreeMap<String, SnapshotEntry>;

/// Build the baseline for `records`; a repeated id keeps its last occurrence.
pub fn snapshot_of(records: &[Record]) -> Snapshot {
    records
        .iter()
        .map(|r| {
            (
                r.id.clone(),
                SnapshotEntry {
                    price: r.price,
                    currency: r.currency.clone(),
                },
            )
        })
        .collect()
}
