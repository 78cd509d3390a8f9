//! Content fingerprinting and the "has this file changed?" gate.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use ring::digest::{Context, SHA256};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::{BoxError, StateStore};

const CHUNK_SIZE: usize = 1 << 20;

/// Lowercase hex SHA-256 of everything `reader` yields, read in 1 MiB chunks.
pub fn fingerprint<R: Read>(mut reader: R) -> io::Result<String> {
    let mut ctx = Context::new(&SHA256);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        ctx.update(&buf[..n]);
    }
    Ok(hex(ctx.finish().as_ref()))
}

/// [`fingerprint`] of a file's bytes.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    fingerprint(File::open(path)?)
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Why the gate could not decide.
#[derive(Debug, Error)]
pub enum GateError {
    /// The source file could not be read.
    #[error("reading {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stored hash could not be read or replaced.
    #[error("hash store: {source}")]
    Store { source: BoxError },
}

/// Outcome of [`should_process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub changed: bool,
    pub hash: String,
}

/// Compare `path` against the stored hash for `supplier`.
///
/// When the content differs (or nothing was stored) the new hash is persisted
/// before returning, so a later failure in the same cycle will not cause the
/// file to be retried.
pub fn should_process(
    store: &dyn StateStore,
    supplier: &str,
    path: &Path,
) -> Result<GateDecision, GateError> {
    let hash = fingerprint_file(path).map_err(|source| GateError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    let previous = store.read_hash(supplier).map_err(|source| GateError::Store { source })?;

    if previous.as_deref() == Some(hash.as_str()) {
        debug!(supplier, hash = %hash, "content unchanged");
        return Ok(GateDecision {
            changed: false,
            hash,
        });
    }

    store.write_hash(supplier, &hash).map_err(|source| GateError::Store { source })?;
    info!(supplier, hash = %hash, first_seen = previous.is_none(), "new content");
    Ok(GateDecision {
        changed: true,
        hash,
    })
}
