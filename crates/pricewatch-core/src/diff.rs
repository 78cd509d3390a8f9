//! Set reconciliation between the current extraction and the stored baseline.
//!
//! Every id in `current ∪ previous` lands in exactly one bucket:
//!
//! | condition | bucket |
//! |---|---|
//! | only in current | `new_items` |
//! | only in previous | `removed_items` |
//! | in both, price rose | `price_up` |
//! | in both, price fell | `price_down` |
//! | in both, equal or either price missing | (unchanged, not reported) |
//!
//! All lists are sorted by id.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::record::{Record, Snapshot};

/// A price movement for an id present on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub id: String,
    pub currency: Option<String>,
    pub old_price: f64,
    pub new_price: f64,
    pub delta: f64,
    /// `delta / old_price * 100`; `None` when the old price is zero.
    pub delta_pct: Option<f64>,
}

/// An id present on one side only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChange {
    pub id: String,
    pub currency: Option<String>,
    pub price: Option<f64>,
}

/// Classified differences for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub price_up: Vec<PriceChange>,
    pub price_down: Vec<PriceChange>,
    pub new_items: Vec<ItemChange>,
    pub removed_items: Vec<ItemChange>,
}

impl Diff {
    /// Whether any bucket is non-empty; gates report generation.
    pub fn has_changes(&self) -> bool {
        !(self.price_up.is_empty()
            && self.price_down.is_empty()
            && self.new_items.is_empty()
            && self.removed_items.is_empty())
    }

    /// Sum of deltas over `price_up`, rounded to 4 decimals.
    pub fn total_increase(&self) -> f64 {
        round4(self.price_up.iter().map(|c| c.delta).sum())
    }

    /// Sum of deltas over `price_down`, rounded to 4 decimals.
    pub fn total_decrease(&self) -> f64 {
        round4(self.price_down.iter().map(|c| c.delta).sum())
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Diff `current` against the `previous` baseline.
///
/// A repeated id in `current` keeps its last occurrence. A record whose price
/// is `None` is still reported as new when its id is new.
pub fn diff(previous: &Snapshot, current: &[Record]) -> Diff {
    let current_map: BTreeMap<&str, &Record> =
        current.iter().map(|r| (r.id.as_str(), r)).collect();

    let current_ids: BTreeSet<&str> = current_map.keys().copied().collect();
    let previous_ids: BTreeSet<&str> = previous.keys().map(String::as_str).collect();

    let mut out = Diff::default();

    for id in current_ids.difference(&previous_ids) {
        let rec = current_map[id];
        out.new_items.push(ItemChange {
            id: rec.id.clone(),
            currency: rec.currency.clone(),
            price: rec.price,
        });
    }

    for id in previous_ids.difference(&current_ids) {
        let entry = &previous[*id];
        out.removed_items.push(ItemChange {
            id: (*id).to_string(),
            currency: entry.currency.clone(),
            price: entry.price,
        });
    }

    for id in current_ids.intersection(&previous_ids) {
        let rec = current_map[id];
        let entry = &previous[*id];
        let (Some(old_price), Some(new_price)) = (entry.price, rec.price) else {
            continue;
        };
        let delta = new_price - old_price;
        if delta == 0.0 {
            continue;
        }
        let change = PriceChange {
            id: rec.id.clone(),
            currency: rec.currency.clone().or_else(|| entry.currency.clone()),
            old_price,
            new_price,
            delta,
            delta_pct: (old_price != 0.0).then(|| delta / old_price * 100.0),
        };
        if delta > 0.0 {
            out.price_up.push(change);
        } else {
            out.price_down.push(change);
        }
    }

    out
}
