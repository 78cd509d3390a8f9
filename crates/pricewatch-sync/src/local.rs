//! Pick up spreadsheets that another process (a browser, a mail rule) dropped
//! into the working directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::{Instant, sleep};
use tracing::debug;

const EXTENSIONS: &[&str] = &["xlsx", "xls"];
const PARTIAL_SUFFIX: &str = ".crdownload";

/// Newest `.xlsx`/`.xls` in `dir` whose lowercase name contains one of
/// `patterns`, modified within `max_age`, and not still being downloaded.
pub fn find_recent(dir: &Path, patterns: &[String], max_age: Duration) -> Option<PathBuf> {
    find_recent_at(dir, patterns, max_age, SystemTime::now())
}

/// Like [`find_recent`], but keep looking every `poll` until `wait` has
/// passed. A zero `wait` checks once.
pub async fn wait_for_recent(
    dir: &Path,
    patterns: &[String],
    max_age: Duration,
    wait: Duration,
    poll: Duration,
) -> Option<PathBuf> {
    let deadline = Instant::now() + wait;
    loop {
        if let Some(found) = find_recent(dir, patterns, max_age) {
            return Some(found);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        debug!(dir = %dir.display(), ?patterns, "no file yet, polling");
        sleep(poll.min(deadline - now)).await;
    }
}

fn find_recent_at(
    dir: &Path,
    patterns: &[String],
    max_age: Duration,
    now: SystemTime,
) -> Option<PathBuf> {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_lowercase()).collect();
    let mut best: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if !path.is_file() || !has_spreadsheet_extension(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let lower = name.to_lowercase();
        if !patterns.iter().any(|p| lower.contains(p.as_str())) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        // Future mtimes (clock skew) count as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            continue;
        }
        if dir.join(format!("{name}{PARTIAL_SUFFIX}")).exists() {
            debug!(file = name, "download in progress, ignoring");
            continue;
        }
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, path));
        }
    }
    best.map(|(_, p)| p)
}

fn has_spreadsheet_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
}
