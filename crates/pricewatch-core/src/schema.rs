/// Arrow schemas and batch builders for every table Pricewatch writes.
///
/// Column order here is the column order of the published files.
pub mod tables {
    use std::sync::Arc;

    use arrow::array::{
        Array, ArrayRef, Float64Array, Float64Builder, Int32Array, StringArray, StringBuilder,
        UInt64Array,
    };
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDateTime;

    use crate::diff::{Diff, ItemChange, PriceChange};
    use crate::record::{Record, Snapshot, SnapshotEntry};

    /// Timestamp rendering used in report summaries.
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    // ── Schemas ──

    /// Published availability table. `stock` is the 0/2/6 unit hint.
    pub fn availability_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("stock", DataType::Int32, true),
            Field::new("price", DataType::Float64, true),
            Field::new("currency", DataType::Utf8, true),
        ])
    }

    /// `price_up.csv` / `price_down.csv`.
    pub fn price_change_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("currency", DataType::Utf8, true),
            Field::new("old_price", DataType::Float64, false),
            Field::new("new_price", DataType::Float64, false),
            Field::new("delta", DataType::Float64, false),
            Field::new("delta_pct", DataType::Float64, true),
        ])
    }

    /// `new_items.csv` / `removed_items.csv`.
    pub fn item_change_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("currency", DataType::Utf8, true),
            Field::new("price", DataType::Float64, true),
        ])
    }

    /// One-row report summary.
    pub fn summary_schema() -> Schema {
        Schema::new(vec![
            Field::new("supplier", DataType::Utf8, false),
            Field::new("generated_at", DataType::Utf8, false),
            Field::new("price_up", DataType::UInt64, false),
            Field::new("price_down", DataType::UInt64, false),
            Field::new("new_items", DataType::UInt64, false),
            Field::new("removed_items", DataType::UInt64, false),
            Field::new("total_increase", DataType::Float64, false),
            Field::new("total_decrease", DataType::Float64, false),
        ])
    }

    /// Persisted per-supplier baseline.
    pub fn snapshot_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("price", DataType::Float64, true),
            Field::new("currency", DataType::Utf8, true),
        ])
    }

    // ── Builders ──

    fn batch(schema: Schema, columns: Vec<ArrayRef>) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(SchemaRef::new(schema), columns)
    }

    fn utf8<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
        let mut b = StringBuilder::new();
        for v in values {
            b.append_option(v);
        }
        Arc::new(b.finish())
    }

    fn f64s(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
        let mut b = Float64Builder::new();
        for v in values {
            b.append_option(v);
        }
        Arc::new(b.finish())
    }

    pub fn availability_batch(records: &[Record]) -> Result<RecordBatch, ArrowError> {
        let stock: Int32Array = records
            .iter()
            .map(|r| r.stock_level.map(|s| s.units()))
            .collect();
        batch(
            availability_schema(),
            vec![
                utf8(records.iter().map(|r| Some(r.id.as_str()))),
                Arc::new(stock),
                f64s(records.iter().map(|r| r.price)),
                utf8(records.iter().map(|r| r.currency.as_deref())),
            ],
        )
    }

    pub fn price_change_batch(changes: &[PriceChange]) -> Result<RecordBatch, ArrowError> {
        batch(
            price_change_schema(),
            vec![
                utf8(changes.iter().map(|c| Some(c.id.as_str()))),
                utf8(changes.iter().map(|c| c.currency.as_deref())),
                f64s(changes.iter().map(|c| Some(c.old_price))),
                f64s(changes.iter().map(|c| Some(c.new_price))),
                f64s(changes.iter().map(|c| Some(c.delta))),
                f64s(changes.iter().map(|c| c.delta_pct)),
            ],
        )
    }

    pub fn item_change_batch(items: &[ItemChange]) -> Result<RecordBatch, ArrowError> {
        batch(
            item_change_schema(),
            vec![
                utf8(items.iter().map(|c| Some(c.id.as_str()))),
                utf8(items.iter().map(|c| c.currency.as_deref())),
                f64s(items.iter().map(|c| c.price)),
            ],
        )
    }

    pub fn summary_batch(
        supplier: &str,
        generated_at: NaiveDateTime,
        diff: &Diff,
    ) -> Result<RecordBatch, ArrowError> {
        let count = |n: usize| -> ArrayRef { Arc::new(UInt64Array::from(vec![n as u64])) };
        batch(
            summary_schema(),
            vec![
                Arc::new(StringArray::from(vec![supplier])),
                Arc::new(StringArray::from(vec![
                    generated_at.format(TIMESTAMP_FORMAT).to_string(),
                ])),
                count(diff.price_up.len()),
                count(diff.price_down.len()),
                count(diff.new_items.len()),
                count(diff.removed_items.len()),
                Arc::new(Float64Array::from(vec![diff.total_increase()])),
                Arc::new(Float64Array::from(vec![diff.total_decrease()])),
            ],
        )
    }

    pub fn snapshot_batch(snapshot: &Snapshot) -> Result<RecordBatch, ArrowError> {
        batch(
            snapshot_schema(),
            vec![
                utf8(snapshot.keys().map(|k| Some(k.as_str()))),
                f64s(snapshot.values().map(|e| e.price)),
                utf8(snapshot.values().map(|e| e.currency.as_deref())),
            ],
        )
    }

    fn column<'a, T: Array + 'static>(
        batch: &'a RecordBatch,
        name: &str,
    ) -> Result<&'a T, ArrowError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<T>())
            .ok_or_else(|| ArrowError::SchemaError(format!("missing or mistyped column '{name}'")))
    }

    /// Rebuild a baseline from batches in [`snapshot_schema`].
    pub fn snapshot_from_batches(batches: &[RecordBatch]) -> Result<Snapshot, ArrowError> {
        let mut snapshot = Snapshot::new();
        for b in batches {
            let ids = column::<StringArray>(b, "id")?;
            let prices = column::<Float64Array>(b, "price")?;
            let currencies = column::<StringArray>(b, "currency")?;
            for i in 0..b.num_rows() {
                if ids.is_null(i) {
                    continue;
                }
                snapshot.insert(
                    ids.value(i).to_string(),
                    SnapshotEntry {
                        price: (!prices.is_null(i)).then(|| prices.value(i)),
                        currency: (!currencies.is_null(i)).then(|| currencies.value(i).to_string()),
                    },
                );
            }
        }
        Ok(snapshot)
    }
}
