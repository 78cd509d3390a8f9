pub mod cell;
pub mod diff;
pub mod error;
pub mod extract;
pub mod gate;
pub mod locate;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod state;
pub mod supplier;

pub use cell::{Cell, Sheet, Workbook, WorkbookError, WorkbookReader};
pub use diff::{Diff, ItemChange, PriceChange, diff};
pub use error::PipelineError;
pub use extract::{ExtractError, Extraction, extract};
pub use gate::{GateDecision, GateError, fingerprint, fingerprint_file, should_process};
pub use pipeline::{CycleStatus, Pipeline, PipelineOptions, ProcessingOutcome};
pub use record::{Record, Snapshot, SnapshotEntry, StockLevel};
pub use schema::tables;
pub use state::{BoxError, MemoryStateStore, ReportSink, StateKind, StateStore};
pub use supplier::{Layout, Positions, PreferredSheet, StockPolicy, SupplierConfig};
