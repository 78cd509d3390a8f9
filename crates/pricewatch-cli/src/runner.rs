//! Drives one scheduling cycle across all configured suppliers.
//!
//! Each supplier runs in its own task: acquisition is async, the rest of the
//! cycle (archive, gate, parse, diff, persist) is blocking file work and runs
//! on the blocking pool. A failed supplier never stops the others.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use pricewatch_core::{CycleStatus, Pipeline, PipelineOptions, ProcessingOutcome, SupplierConfig};
use pricewatch_store::{CalamineReader, FsStateStore};
use tokio::task::{Id, JoinSet};
use tracing::{error, info, warn};

use crate::config::{AppConfig, ResolvedSupplier};
use crate::report::CsvReportSink;

pub const DAILY_DIR: &str = "_daily";
pub const ORIGINALS_DIR: &str = "_originals";
/// Written to the workdir when any supplier reported changes, for the
/// scheduler to pick up. Never removed here.
pub const CHANGES_FLAG: &str = "CHANGES_FLAG";

/// Result row for one supplier.
#[derive(Debug, Clone)]
pub struct SupplierRun {
    pub supplier: String,
    pub status: CycleStatus,
    pub source: Option<PathBuf>,
    pub records: usize,
    pub report: Option<String>,
    pub error: Option<String>,
}

impl SupplierRun {
    fn failed(supplier: String, source: Option<PathBuf>, error: String) -> Self {
        Self::from_result(supplier, source, Err(error))
    }

    fn from_result(
        supplier: String,
        source: Option<PathBuf>,
        result: Result<ProcessingOutcome, String>,
    ) -> Self {
        match result {
            Ok(outcome) => Self {
                supplier,
                status: outcome.status,
                source,
                records: outcome.records,
                report: outcome.report_ref,
                error: None,
            },
            Err(e) => Self {
                supplier,
                status: CycleStatus::Failed,
                source,
                records: 0,
                report: None,
                error: Some(e),
            },
        }
    }
}

/// Build the pipeline for `workdir` with the filesystem adapters.
pub fn build_pipeline(workdir: &Path, options: PipelineOptions) -> anyhow::Result<Pipeline> {
    std::fs::create_dir_all(workdir)
        .with_context(|| format!("creating workdir {}", workdir.display()))?;
    let state = FsStateStore::open(workdir).context("opening state directory")?;
    Ok(Pipeline::new(
        Arc::new(CalamineReader),
        Arc::new(state),
        Arc::new(CsvReportSink::new(workdir)),
        options,
    ))
}

/// Acquire and process every supplier concurrently. Results keep config order.
pub async fn run_all(
    config: &AppConfig,
    suppliers: Vec<ResolvedSupplier>,
) -> anyhow::Result<Vec<SupplierRun>> {
    let pipeline = build_pipeline(
        &config.workdir,
        PipelineOptions {
            delete_unchanged_source: config.delete_unchanged_source,
        },
    )?;

    let mut tasks = SupplierTasks::default();
    for supplier in suppliers {
        let pipeline = pipeline.clone();
        let workdir = config.workdir.clone();
        let archive = config.archive_originals;
        let id = supplier.config.id.clone();
        tasks.spawn(id.clone(), async move {
            let source = match &supplier.source {
                Some(spec) => pricewatch_sync::acquire(spec, &id, &workdir).await,
                None => None,
            };
            info!(supplier = %id, source = ?source, "acquired");
            let archive_root = archive.then_some(workdir);
            process_blocking(pipeline, supplier.config, source, archive_root).await
        });
    }

    let runs = tasks.join_all().await;
    flag_changes(&config.workdir, &runs);
    Ok(runs)
}

/// Supplier tasks keyed by task id, so a task that panics is still reported
/// against its supplier while the others run to completion.
#[derive(Default)]
struct SupplierTasks {
    set: JoinSet<SupplierRun>,
    slots: HashMap<Id, (usize, String)>,
}

impl SupplierTasks {
    fn spawn<F>(&mut self, supplier: String, task: F)
    where
        F: Future<Output = SupplierRun> + Send + 'static,
    {
        let idx = self.slots.len();
        let handle = self.set.spawn(task);
        self.slots.insert(handle.id(), (idx, supplier));
    }

    async fn join_all(mut self) -> Vec<SupplierRun> {
        let mut runs: Vec<Option<SupplierRun>> = vec![None; self.slots.len()];
        while let Some(joined) = self.set.join_next_with_id().await {
            let (id, run) = match joined {
                Ok((id, run)) => (id, run),
                Err(e) => {
                    let id = e.id();
                    let supplier = self.slots.get(&id).map(|(_, s)| s.clone()).unwrap_or_default();
                    error!(supplier = %supplier, error = %e, "supplier task aborted");
                    (id, SupplierRun::failed(supplier, None, format!("task failed: {e}")))
                }
            };
            if let Some((idx, _)) = self.slots.get(&id) {
                runs[*idx] = Some(run);
            }
        }
        runs.into_iter().flatten().collect()
    }
}

/// Write [`CHANGES_FLAG`] when any run produced a report. Failures are logged only.
pub fn flag_changes(workdir: &Path, runs: &[SupplierRun]) -> Option<PathBuf> {
    if !runs.iter().any(|r| r.status == CycleStatus::ProcessedWithReport) {
        return None;
    }
    let flag = workdir.join(CHANGES_FLAG);
    match std::fs::write(&flag, "1") {
        Ok(()) => {
            info!(file = %flag.display(), "changes flagged");
            Some(flag)
        }
        Err(e) => {
            warn!(file = %flag.display(), error = %e, "could not write changes flag");
            None
        }
    }
}

/// Process one local file for `supplier`, without acquisition.
pub async fn run_one(pipeline: Pipeline, supplier: SupplierConfig, file: PathBuf) -> SupplierRun {
    process_blocking(pipeline, supplier, Some(file), None).await
}

async fn process_blocking(
    pipeline: Pipeline,
    supplier: SupplierConfig,
    source: Option<PathBuf>,
    archive_root: Option<PathBuf>,
) -> SupplierRun {
    let id = supplier.id.clone();
    let task_source = source.clone();
    let joined = tokio::task::spawn_blocking(move || {
        if let (Some(root), Some(path)) = (&archive_root, &task_source) {
            archive_original(root, path);
        }
        pipeline
            .process_supplier(&supplier, task_source.as_deref())
            .map_err(|e| e.to_string())
    })
    .await;

    let result = joined.unwrap_or_else(|e| Err(format!("task failed: {e}")));
    let run = SupplierRun::from_result(id, source, result);
    match &run.error {
        Some(e) => error!(supplier = %run.supplier, error = %e, "cycle failed"),
        None => info!(supplier = %run.supplier, status = %run.status, "cycle finished"),
    }
    run
}

/// Copy `path` into `_daily/<YYYYMMDD>/_originals/` unless a file of that
/// name is already there. Failures are logged only.
pub fn archive_original(workdir: &Path, path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let dir = workdir
        .join(DAILY_DIR)
        .join(Local::now().format("%Y%m%d").to_string())
        .join(ORIGINALS_DIR);
    let dst = dir.join(name);
    if dst.exists() {
        return Some(dst);
    }
    let copied = std::fs::create_dir_all(&dir).and_then(|_| std::fs::copy(path, &dst));
    match copied {
        Ok(_) => {
            info!(file = %dst.display(), "original archived");
            Some(dst)
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "could not archive original");
            None
        }
    }
}
