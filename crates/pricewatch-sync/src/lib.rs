//! Acquisition layer: turns a configured source into a local spreadsheet path.
//!
//! Every failure ends in `None` plus a `warn` log. The pipeline treats that as
//! "no source this cycle" and never sees the underlying error.

#[cfg(feature = "http")]
pub mod http;
pub mod local;

#[cfg(feature = "http")]
pub use http::{FetchError, HttpFetcher};
pub use local::{find_recent, wait_for_recent};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where a supplier's file comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Direct download link.
    Http { url: String },
    /// A file another process saves into the working directory.
    ///
    /// With a non-zero `wait_secs` the directory is re-checked every
    /// `poll_secs` until a file shows up or the wait runs out.
    RecentFile {
        patterns: Vec<String>,
        #[serde(default = "default_max_age_secs")]
        max_age_secs: u64,
        #[serde(default)]
        wait_secs: u64,
        #[serde(default = "default_poll_secs")]
        poll_secs: u64,
    },
}

fn default_max_age_secs() -> u64 {
    180
}

fn default_poll_secs() -> u64 {
    2
}

/// Fetch or locate the source for `supplier` inside `workdir`.
pub async fn acquire(spec: &SourceSpec, supplier: &str, workdir: &Path) -> Option<PathBuf> {
    match spec {
        #[cfg(feature = "http")]
        SourceSpec::Http { url } => {
            let fetched = match HttpFetcher::new(workdir) {
                Ok(fetcher) => fetcher.download(url, supplier).await,
                Err(e) => Err(e),
            };
            fetched
                .inspect_err(|e| warn!(supplier, error = %e, "download failed"))
                .ok()
        }
        #[cfg(not(feature = "http"))]
        SourceSpec::Http { url } => {
            warn!(supplier, url = %url, "built without http support");
            None
        }
        SourceSpec::RecentFile {
            patterns,
            max_age_secs,
            wait_secs,
            poll_secs,
        } => {
            let found = wait_for_recent(
                workdir,
                patterns,
                Duration::from_secs(*max_age_secs),
                Duration::from_secs(*wait_secs),
                Duration::from_secs((*poll_secs).max(1)),
            )
            .await;
            if found.is_none() {
                warn!(supplier, ?patterns, max_age_secs, wait_secs, "no recent file found");
            }
            found
        }
    }
}
