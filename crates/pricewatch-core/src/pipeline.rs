//! The per-supplier processing cycle.
//!
//! ```text
//! source ─► gate ─► open ─► extract ─┬─► availability table
//!                                    └─► diff vs snapshot ─► report ─► snapshot
//! ```
//!
//! Steps run strictly in order. A failure stops the cycle for that supplier
//! only; the caller decides how to continue with the others.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cell::WorkbookReader;
use crate::diff::diff;
use crate::error::PipelineError;
use crate::extract::extract;
use crate::gate::{GateError, should_process};
use crate::record::snapshot_of;
use crate::state::{BoxError, ReportSink, StateKind, StateStore};
use crate::supplier::SupplierConfig;

/// User-visible result category of one supplier cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    SkippedNoSource,
    SkippedUnchanged,
    ProcessedNoDiff,
    ProcessedWithReport,
    Failed,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkippedNoSource => "skipped-no-source",
            Self::SkippedUnchanged => "skipped-unchanged",
            Self::ProcessedNoDiff => "processed-no-diff",
            Self::ProcessedWithReport => "processed-with-report",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub status: CycleStatus,
    /// The source passed the gate and was extracted.
    pub processed: bool,
    /// The diff found at least one change.
    pub changed: bool,
    pub report_ref: Option<String>,
    pub availability_ref: Option<String>,
    /// Records extracted for the diff (mirrors excluded).
    pub records: usize,
}

impl ProcessingOutcome {
    fn skipped(status: CycleStatus) -> Self {
        Self {
            status,
            processed: false,
            changed: false,
            report_ref: None,
            availability_ref: None,
            records: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Remove a source file the gate judged unchanged.
    pub delete_unchanged_source: bool,
}

/// Wires the ports together. Cheap to clone; one clone per supplier task.
#[derive(Clone)]
pub struct Pipeline {
    reader: Arc<dyn WorkbookReader>,
    state: Arc<dyn StateStore>,
    sink: Arc<dyn ReportSink>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        reader: Arc<dyn WorkbookReader>,
        state: Arc<dyn StateStore>,
        sink: Arc<dyn ReportSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            reader,
            state,
            sink,
            options,
        }
    }

    /// Run one cycle for `supplier` on `source`.
    ///
    /// `None` means acquisition failed; the cycle is skipped without error.
    pub fn process_supplier(
        &self,
        supplier: &SupplierConfig,
        source: Option<&Path>,
    ) -> Result<ProcessingOutcome, PipelineError> {
        let id = supplier.id.as_str();

        let Some(path) = source else {
            warn!(supplier = id, "no source file, skipping");
            return Ok(ProcessingOutcome::skipped(CycleStatus::SkippedNoSource));
        };

        let gate = should_process(self.state.as_ref(), id, path).map_err(|e| match e {
            GateError::Source { path, source } => {
                error!(supplier = id, file = %path.display(), error = %source, "source unreadable");
                PipelineError::Source {
                    supplier: id.to_string(),
                    path,
                    source,
                }
            }
            GateError::Store { source } => self.persistence(id, StateKind::Hash, source),
        })?;

        if !gate.changed {
            info!(supplier = id, file = %path.display(), "unchanged content, skipping");
            if self.options.delete_unchanged_source {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(supplier = id, file = %path.display(), error = %e, "could not delete unchanged source");
                }
            }
            return Ok(ProcessingOutcome::skipped(CycleStatus::SkippedUnchanged));
        }

        let workbook = self
            .reader
            .open(path)
            .map_err(|source| PipelineError::Workbook {
                supplier: id.to_string(),
                source,
            })?;

        let extraction = extract(&workbook, supplier).map_err(|source| PipelineError::Extract {
            supplier: id.to_string(),
            source,
        })?;

        let availability_ref = self
            .sink
            .write_availability(path, &extraction.availability)
            .map_err(|source| PipelineError::Report {
                supplier: id.to_string(),
                source,
            })?;

        let previous = self
            .state
            .read_snapshot(id)
            .map_err(|source| self.persistence(id, StateKind::Snapshot, source))?;

        let mut outcome = ProcessingOutcome {
            status: CycleStatus::ProcessedNoDiff,
            processed: true,
            changed: false,
            report_ref: None,
            availability_ref: Some(availability_ref),
            records: extraction.records.len(),
        };

        match previous {
            None => {
                info!(
                    supplier = id,
                    records = extraction.records.len(),
                    "no previous snapshot, establishing baseline"
                );
            }
            Some(previous) => {
                let changes = diff(&previous, &extraction.records);
                if changes.has_changes() {
                    let report = self.sink.write_diff(id, &changes).map_err(|source| {
                        PipelineError::Report {
                            supplier: id.to_string(),
                            source,
                        }
                    })?;
                    info!(
                        supplier = id,
                        up = changes.price_up.len(),
                        down = changes.price_down.len(),
                        new = changes.new_items.len(),
                        removed = changes.removed_items.len(),
                        report = %report,
                        "changes detected"
                    );
                    outcome.status = CycleStatus::ProcessedWithReport;
                    outcome.changed = true;
                    outcome.report_ref = Some(report);
                } else {
                    info!(supplier = id, "content changed but no price or item changes");
                }
            }
        }

        self.state
            .write_snapshot(id, &snapshot_of(&extraction.records))
            .map_err(|source| self.persistence(id, StateKind::Snapshot, source))?;

        Ok(outcome)
    }

    fn persistence(
        &self,
        supplier: &str,
        kind: StateKind,
        source: BoxError,
    ) -> PipelineError {
        error!(supplier, %kind, error = %source, "state access failed");
        PipelineError::Persistence {
            supplier: supplier.to_string(),
            kind,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::cell::{Cell, Sheet, Workbook, WorkbookError};
    use crate::diff::Diff;
    use crate::record::{Record, Snapshot};
    use crate::state::MemoryStateStore;
    use crate::supplier::StockPolicy;

    /// Serves workbooks keyed by path.
    #[derive(Default)]
    struct FakeReader {
        books: Mutex<HashMap<PathBuf, Workbook>>,
    }

    impl FakeReader {
        fn put(&self, path: &Path, book: Workbook) {
            self.books.lock().unwrap().insert(path.to_path_buf(), book);
        }
    }

    impl WorkbookReader for FakeReader {
        fn open(&self, path: &Path) -> Result<Workbook, WorkbookError> {
            self.books
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| WorkbookError::Open {
                    path: path.to_path_buf(),
                    source: "not a workbook".into(),
                })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        availability: Mutex<Vec<Vec<Record>>>,
        diffs: Mutex<Vec<Diff>>,
    }

    impl ReportSink for RecordingSink {
        fn write_availability(&self, source: &Path, records: &[Record]) -> Result<String, BoxError> {
            self.availability.lock().unwrap().push(records.to_vec());
            Ok(format!("avail:{}", source.display()))
        }

        fn write_diff(&self, supplier: &str, diff: &Diff) -> Result<String, BoxError> {
            let mut diffs = self.diffs.lock().unwrap();
            diffs.push(diff.clone());
            Ok(format!("{supplier}#{}", diffs.len()))
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        reader: Arc<FakeReader>,
        state: Arc<MemoryStateStore>,
        sink: Arc<RecordingSink>,
        pipeline: Pipeline,
    }

    impl Harness {
        fn new(options: PipelineOptions) -> Self {
            let reader = Arc::new(FakeReader::default());
            let state = Arc::new(MemoryStateStore::new());
            let sink = Arc::new(RecordingSink::default());
            let pipeline = Pipeline::new(reader.clone(), state.clone(), sink.clone(), options);
            Self {
                dir: tempfile::TempDir::new().unwrap(),
                reader,
                state,
                sink,
                pipeline,
            }
        }

        /// Write a distinct source file and register its parsed form.
        fn source(&self, name: &str, rows: &[(&str, f64, &str)]) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, format!("{rows:?}")).unwrap();
            let mut grid = vec![vec![
                Cell::from("Codigo"),
                Cell::from("Precio"),
                Cell::from("Moneda"),
                Cell::from("Stock"),
            ]];
            for (code, price, stock) in rows {
                grid.push(vec![
                    Cell::from(*code),
                    Cell::Number(*price),
                    Cell::from("USD"),
                    Cell::from(*stock),
                ]);
            }
            self.reader
                .put(&path, Workbook::new(vec![Sheet::new("Hoja1", grid)]));
            path
        }
    }

    fn supplier() -> SupplierConfig {
        SupplierConfig {
            id: "Acme".into(),
            layout: Default::default(),
            stock_policy: StockPolicy::Threshold { min_units: 5.0 },
            mirror_ids: true,
            truncate_ids: false,
        }
    }

    #[test]
    fn missing_source_is_skipped() {
        let h = Harness::new(PipelineOptions::default());
        let out = h.pipeline.process_supplier(&supplier(), None).unwrap();
        assert_eq!(out.status, CycleStatus::SkippedNoSource);
        assert!(!out.processed);
    }

    #[test]
    fn cold_start_builds_baseline_without_report() {
        let h = Harness::new(PipelineOptions::default());
        let path = h.source("a.xlsx", &[("A1", 100.0, "Mayor a 5"), ("B2", 50.0, "Sin stock")]);

        let out = h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();
        assert_eq!(out.status, CycleStatus::ProcessedNoDiff);
        assert!(out.processed);
        assert!(!out.changed);
        assert_eq!(out.report_ref, None);
        assert_eq!(out.records, 2);
        assert!(h.sink.diffs.lock().unwrap().is_empty());

        let snap = h.state.read_snapshot("Acme").unwrap().unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn availability_is_filtered_and_mirrored() {
        let h = Harness::new(PipelineOptions::default());
        let path = h.source("a.xlsx", &[("F100", 1.0, "Mayor a 5"), ("X9", 1.0, "Sin stock")]);
        h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();

        let published = h.sink.availability.lock().unwrap();
        let ids: Vec<&str> = published[0].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["F100", "T100"]);
    }

    #[test]
    fn identical_content_is_processed_once() {
        let h = Harness::new(PipelineOptions::default());
        let path = h.source("a.xlsx", &[("A1", 100.0, "10")]);

        let first = h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();
        assert!(first.processed);
        let second = h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();
        assert_eq!(second.status, CycleStatus::SkippedUnchanged);
        assert!(!second.processed);
        assert!(path.exists());
    }

    #[test]
    fn unchanged_source_can_be_deleted() {
        let h = Harness::new(PipelineOptions {
            delete_unchanged_source: true,
        });
        let path = h.source("a.xlsx", &[("A1", 100.0, "10")]);
        h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();
        assert!(path.exists());
        h.pipeline.process_supplier(&supplier(), Some(&path)).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn price_change_produces_report_and_new_baseline() {
        let h = Harness::new(PipelineOptions::default());
        let day1 = h.source("day1.xlsx", &[("A1", 100.0, "10")]);
        h.pipeline.process_supplier(&supplier(), Some(&day1)).unwrap();

        let day2 = h.source("day2.xlsx", &[("A1", 120.0, "10"), ("B2", 50.0, "10")]);
        let out = h.pipeline.process_supplier(&supplier(), Some(&day2)).unwrap();
        assert_eq!(out.status, CycleStatus::ProcessedWithReport);
        assert!(out.changed);
        assert_eq!(out.report_ref.as_deref(), Some("Acme#1"));

        let diffs = h.sink.diffs.lock().unwrap();
        assert_eq!(diffs[0].price_up.len(), 1);
        assert_eq!(diffs[0].price_up[0].delta, 20.0);
        assert_eq!(diffs[0].new_items[0].id, "B2");

        let snap = h.state.read_snapshot("Acme").unwrap().unwrap();
        assert_eq!(snap["A1"].price, Some(120.0));
        assert!(snap.contains_key("B2"));
    }

    #[test]
    fn new_content_without_semantic_change_skips_report() {
        let h = Harness::new(PipelineOptions::default());
        let day1 = h.source("day1.xlsx", &[("A1", 100.0, "10")]);
        h.pipeline.process_supplier(&supplier(), Some(&day1)).unwrap();

        // Stock moved but prices did not.
        let day2 = h.source("day2.xlsx", &[("A1", 100.0, "3")]);
        let out = h.pipeline.process_supplier(&supplier(), Some(&day2)).unwrap();
        assert_eq!(out.status, CycleStatus::ProcessedNoDiff);
        assert!(out.processed);
        assert!(!out.changed);
        assert!(h.sink.diffs.lock().unwrap().is_empty());
    }

    #[test]
    fn unreadable_workbook_keeps_snapshot() {
        let h = Harness::new(PipelineOptions::default());
        let day1 = h.source("day1.xlsx", &[("A1", 100.0, "10")]);
        h.pipeline.process_supplier(&supplier(), Some(&day1)).unwrap();
        let before = h.state.read_snapshot("Acme").unwrap();

        let broken = h.dir.path().join("broken.xlsx");
        std::fs::write(&broken, b"garbage").unwrap();
        let err = h
            .pipeline
            .process_supplier(&supplier(), Some(&broken))
            .unwrap_err();
        assert!(err.is_parse_failure());
        assert_eq!(err.supplier(), "Acme");
        assert_eq!(h.state.read_snapshot("Acme").unwrap(), before);

        // The gate already recorded the broken content.
        let again = h.pipeline.process_supplier(&supplier(), Some(&broken)).unwrap();
        assert_eq!(again.status, CycleStatus::SkippedUnchanged);
    }

    /// Fails writes of one kind for one supplier; everything else is served
    /// from memory.
    struct FailingStore {
        inner: MemoryStateStore,
        supplier: &'static str,
        kind: StateKind,
    }

    impl FailingStore {
        fn check(&self, supplier: &str, kind: StateKind) -> Result<(), BoxError> {
            if supplier == self.supplier && kind == self.kind {
                return Err(format!("disk full writing {kind}").into());
            }
            Ok(())
        }
    }

    impl StateStore for FailingStore {
        fn read_hash(&self, supplier: &str) -> Result<Option<String>, BoxError> {
            self.inner.read_hash(supplier)
        }

        fn write_hash(&self, supplier: &str, hash: &str) -> Result<(), BoxError> {
            self.check(supplier, StateKind::Hash)?;
            self.inner.write_hash(supplier, hash)
        }

        fn read_snapshot(&self, supplier: &str) -> Result<Option<Snapshot>, BoxError> {
            self.inner.read_snapshot(supplier)
        }

        fn write_snapshot(&self, supplier: &str, snapshot: &Snapshot) -> Result<(), BoxError> {
            self.check(supplier, StateKind::Snapshot)?;
            self.inner.write_snapshot(supplier, snapshot)
        }
    }

    fn failing_pipeline(h: &Harness, kind: StateKind) -> (Pipeline, Arc<FailingStore>) {
        let store = Arc::new(FailingStore {
            inner: MemoryStateStore::new(),
            supplier: "Acme",
            kind,
        });
        let pipeline = Pipeline::new(
            h.reader.clone(),
            store.clone(),
            h.sink.clone(),
            PipelineOptions::default(),
        );
        (pipeline, store)
    }

    #[test]
    fn snapshot_write_failure_is_surfaced() {
        let h = Harness::new(PipelineOptions::default());
        let (pipeline, store) = failing_pipeline(&h, StateKind::Snapshot);
        let path = h.source("a.xlsx", &[("A1", 100.0, "10")]);

        let err = pipeline.process_supplier(&supplier(), Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence {
                kind: StateKind::Snapshot,
                ..
            }
        ));
        assert_eq!(err.supplier(), "Acme");
        assert!(!err.is_parse_failure());
        assert_eq!(store.read_snapshot("Acme").unwrap(), None);

        // Another supplier sharing the store is unaffected.
        let mut other = supplier();
        other.id = "Other".into();
        let out = pipeline.process_supplier(&other, Some(&path)).unwrap();
        assert_eq!(out.status, CycleStatus::ProcessedNoDiff);
        assert!(store.read_snapshot("Other").unwrap().is_some());
    }

    #[test]
    fn hash_write_failure_stops_before_extraction() {
        let h = Harness::new(PipelineOptions::default());
        let (pipeline, store) = failing_pipeline(&h, StateKind::Hash);
        let path = h.source("a.xlsx", &[("A1", 100.0, "10")]);

        let err = pipeline.process_supplier(&supplier(), Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence {
                kind: StateKind::Hash,
                ..
            }
        ));
        assert!(err.to_string().contains("disk full"));
        assert!(h.sink.availability.lock().unwrap().is_empty());
        assert_eq!(store.read_snapshot("Acme").unwrap(), None);
    }

    #[test]
    fn vanished_source_is_not_a_state_failure() {
        let h = Harness::new(PipelineOptions::default());
        let gone = h.dir.path().join("gone.xlsx");
        let err = h
            .pipeline
            .process_supplier(&supplier(), Some(&gone))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Source { .. }));
        assert_eq!(err.supplier(), "Acme");
        assert_eq!(h.state.read_hash("Acme").unwrap(), None);
    }

    #[test]
    fn empty_sheet_is_an_extraction_failure() {
        let h = Harness::new(PipelineOptions::default());
        let path = h.source("empty.xlsx", &[]);
        let err = h
            .pipeline
            .process_supplier(&supplier(), Some(&path))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extract { .. }));
        assert_eq!(h.state.read_snapshot("Acme").unwrap(), None);
    }
}
