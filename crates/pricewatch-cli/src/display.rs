//! Terminal output for a finished cycle.
//!
//! The per-supplier results are rendered as an Arrow pretty-printed table,
//! followed by one detail line per produced report or failure.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use pricewatch_core::CycleStatus;

use crate::runner::SupplierRun;

// ── Public API ──

/// Print the summary table and details for `runs`.
pub fn print_cycle_summary(runs: &[SupplierRun]) -> anyhow::Result<()> {
    if runs.is_empty() {
        println!("No suppliers selected.");
        return Ok(());
    }
    let batch = summary_batch(runs)?;
    println!("{}", pretty_format_batches(&[batch])?);

    let details = detail_lines(runs);
    if !details.is_empty() {
        println!();
        for line in details {
            println!("{line}");
        }
    }
    Ok(())
}

/// Whether any supplier failed; drives the process exit code.
pub fn any_failed(runs: &[SupplierRun]) -> bool {
    runs.iter().any(|r| r.status == CycleStatus::Failed)
}

// ── Table ──

fn summary_batch(runs: &[SupplierRun]) -> anyhow::Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("supplier", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("records", DataType::UInt64, false),
        Field::new("source", DataType::Utf8, true),
    ]);
    let suppliers: StringArray = runs.iter().map(|r| Some(r.supplier.as_str())).collect();
    let statuses: StringArray = runs.iter().map(|r| Some(r.status.as_str())).collect();
    let records: UInt64Array = runs.iter().map(|r| Some(r.records as u64)).collect();
    let sources: StringArray = runs
        .iter()
        .map(|r| {
            r.source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        })
        .collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(suppliers),
        Arc::new(statuses),
        Arc::new(records),
        Arc::new(sources),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

// ── Details ──

fn detail_lines(runs: &[SupplierRun]) -> Vec<String> {
    let mut out = Vec::new();
    for run in runs {
        if let Some(report) = &run.report {
            out.push(format!("  {:<26} report: {}", run.supplier, report));
        }
        if let Some(err) = &run.error {
            out.push(format!("  {:<26} error: {}", run.supplier, err));
        }
    }
    out
}
