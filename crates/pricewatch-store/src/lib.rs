//! Storage layer: filesystem state, Parquet snapshots, spreadsheet reading.

mod error;
pub use error::StoreError;

pub mod fs;
pub use fs::FsStateStore;

pub mod snapshot;
pub use snapshot::{read_parquet, write_parquet};

mod workbook;
pub use workbook::CalamineReader;
