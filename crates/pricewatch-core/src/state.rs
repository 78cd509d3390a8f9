//! Persistence ports used by the pipeline.
//!
//! Two per-supplier values survive between runs: the content hash of the last
//! source file seen, and the price snapshot of the last successful diff. Where
//! and how they are kept is up to the implementor (`pricewatch-store` keeps
//! them under `_state/`). Report rendering is likewise behind [`ReportSink`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::diff::Diff;
use crate::record::{Record, Snapshot};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which per-supplier value a state error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Hash,
    Snapshot,
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Hash => "hash",
            Self::Snapshot => "snapshot",
        })
    }
}

/// Durable per-supplier state.
///
/// Reads of absent values return `Ok(None)`. Writes replace the previous
/// value wholesale.
pub trait StateStore: Send + Sync {
    fn read_hash(&self, supplier: &str) -> Result<Option<String>, BoxError>;
    fn write_hash(&self, supplier: &str, hash: &str) -> Result<(), BoxError>;
    fn read_snapshot(&self, supplier: &str) -> Result<Option<Snapshot>, BoxError>;
    fn write_snapshot(&self, supplier: &str, snapshot: &Snapshot) -> Result<(), BoxError>;
}

/// Output side of a processing cycle.
///
/// Both methods return a human-readable reference (usually a path) to what
/// they produced.
pub trait ReportSink: Send + Sync {
    /// Publish the availability table derived from `source`.
    fn write_availability(&self, source: &Path, records: &[Record]) -> Result<String, BoxError>;

    /// Persist a change report for `supplier`.
    fn write_diff(&self, supplier: &str, diff: &Diff) -> Result<String, BoxError>;
}

/// In-process [`StateStore`], used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    hashes: Mutex<HashMap<String, String>>,
    snapshots: Mutex<HashMap<String, Snapshot>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> BoxError {
    "state mutex poisoned".into()
}

impl StateStore for MemoryStateStore {
    fn read_hash(&self, supplier: &str) -> Result<Option<String>, BoxError> {
        Ok(self.hashes.lock().map_err(poisoned)?.get(supplier).cloned())
    }

    fn write_hash(&self, supplier: &str, hash: &str) -> Result<(), BoxError> {
        self.hashes
            .lock()
            .map_err(poisoned)?
            .insert(supplier.to_string(), hash.to_string());
        Ok(())
    }

    fn read_snapshot(&self, supplier: &str) -> Result<Option<Snapshot>, BoxError> {
        Ok(self.snapshots.lock().map_err(poisoned)?.get(supplier).cloned())
    }

    fn write_snapshot(&self, supplier: &str, snapshot: &Snapshot) -> Result<(), BoxError> {
        self.snapshots
            .lock()
            .map_err(poisoned)?
            .insert(supplier.to_string(), snapshot.clone());
        Ok(())
    }
}
