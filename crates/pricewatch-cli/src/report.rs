//! CSV rendering of availability tables and diff reports.
//!
//! ```text
//! <workdir>/
//!   public_listas/<source-stem>_HOJA1.csv
//!   _reports/<supplier>_DIFF_<YYYYmmdd_HHMMSS>/
//!     summary.csv  price_up.csv  price_down.csv  new_items.csv  removed_items.csv
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use chrono::Local;
use pricewatch_core::{BoxError, Diff, Record, ReportSink, tables};
use tracing::info;

pub const PUBLIC_DIR: &str = "public_listas";
pub const REPORTS_DIR: &str = "_reports";
const AVAILABILITY_SUFFIX: &str = "_HOJA1";

pub struct CsvReportSink {
    public_dir: PathBuf,
    reports_dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(workdir: &Path) -> Self {
        Self {
            public_dir: workdir.join(PUBLIC_DIR),
            reports_dir: workdir.join(REPORTS_DIR),
        }
    }

    fn availability(&self, source: &Path, records: &[Record]) -> anyhow::Result<PathBuf> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("source has no usable name: {}", source.display()))?;
        std::fs::create_dir_all(&self.public_dir)?;
        let out = self.public_dir.join(format!("{stem}{AVAILABILITY_SUFFIX}.csv"));
        write_csv(&out, &tables::availability_batch(records)?)?;
        info!(file = %out.display(), rows = records.len(), "availability table written");
        Ok(out)
    }

    fn diff_report(&self, supplier: &str, diff: &Diff) -> anyhow::Result<PathBuf> {
        let now = Local::now().naive_local();
        let dir = self
            .reports_dir
            .join(format!("{supplier}_DIFF_{}", now.format("%Y%m%d_%H%M%S")));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating report dir {}", dir.display()))?;

        write_csv(&dir.join("summary.csv"), &tables::summary_batch(supplier, now, diff)?)?;
        write_csv(&dir.join("price_up.csv"), &tables::price_change_batch(&diff.price_up)?)?;
        write_csv(&dir.join("price_down.csv"), &tables::price_change_batch(&diff.price_down)?)?;
        write_csv(&dir.join("new_items.csv"), &tables::item_change_batch(&diff.new_items)?)?;
        write_csv(
            &dir.join("removed_items.csv"),
            &tables::item_change_batch(&diff.removed_items)?,
        )?;
        Ok(dir)
    }
}

fn write_csv(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer
        .write(batch)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

impl ReportSink for CsvReportSink {
    fn write_availability(&self, source: &Path, records: &[Record]) -> Result<String, BoxError> {
        let path = self.availability(source, records)?;
        Ok(path.display().to_string())
    }

    fn write_diff(&self, supplier: &str, diff: &Diff) -> Result<String, BoxError> {
        let path = self.diff_report(supplier, diff)?;
        Ok(path.display().to_string())
    }
}
