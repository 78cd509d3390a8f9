//! Parquet persistence for per-supplier price baselines.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pricewatch_core::{Snapshot, tables};
use tempfile::NamedTempFile;

use crate::StoreError;

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

/// Write `batch` to `path`, replacing any existing file atomically.
///
/// The data lands in a temporary file in the same directory first, so a
/// reader never observes a half-written snapshot.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Other(format!("no parent directory for {path:?}")))?;
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    let mut writer = ArrowWriter::try_new(tmp.reopen()?, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;

    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let batches = read_parquet(path)?;
    Ok(tables::snapshot_from_batches(&batches)?)
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    write_parquet(path, &tables::snapshot_batch(snapshot)?)
}
