use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cell::WorkbookError;
use crate::extract::ExtractError;
use crate::state::{BoxError, StateKind};

/// Failure of one supplier's cycle. Never affects other suppliers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{supplier}: cannot read source {}: {source}", path.display())]
    Source {
        supplier: String,
        path: PathBuf,
        source: io::Error,
    },

    #[error("{supplier}: {source}")]
    Workbook {
        supplier: String,
        source: WorkbookError,
    },

    #[error("{supplier}: {source}")]
    Extract {
        supplier: String,
        source: ExtractError,
    },

    #[error("{supplier}: {kind} state: {source}")]
    Persistence {
        supplier: String,
        kind: StateKind,
        source: BoxError,
    },

    #[error("{supplier}: report: {source}")]
    Report { supplier: String, source: BoxError },
}

impl PipelineError {
    pub fn supplier(&self) -> &str {
        match self {
            Self::Source { supplier, .. }
            | Self::Workbook { supplier, .. }
            | Self::Extract { supplier, .. }
            | Self::Persistence { supplier, .. }
            | Self::Report { supplier, .. } => supplier,
        }
    }

    /// Unreadable or empty workbook. The snapshot is untouched; the content
    /// hash has already been recorded by the gate.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Workbook { .. } | Self::Extract { .. })
    }
}
