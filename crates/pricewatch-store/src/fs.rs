//! Filesystem-backed [`StateStore`].
//!
//! Layout under the state directory:
//!
//! ```text
//! _state/
//!   <supplier>.sha256             last seen content hash (hex, one line)
//!   <supplier>_snapshot.parquet   last diffed baseline
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use pricewatch_core::{BoxError, Snapshot, StateStore};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::StoreError;
use crate::snapshot::{read_snapshot, write_snapshot};

pub const STATE_DIR: &str = "_state";

pub struct FsStateStore {
    dir: PathBuf,
}

impl FsStateStore {
    /// Open (creating if needed) the state directory under `workdir`.
    pub fn open(workdir: &Path) -> Result<Self, StoreError> {
        let dir = workdir.join(STATE_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn hash_path(&self, supplier: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.sha256", checked_key(supplier)?)))
    }

    pub fn snapshot_path(&self, supplier: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}_snapshot.parquet", checked_key(supplier)?)))
    }

    fn load_hash(&self, supplier: &str) -> Result<Option<String>, StoreError> {
        let path = self.hash_path(supplier)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s.trim().to_string()).filter(|h| !h.is_empty())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_hash(&self, supplier: &str, hash: &str) -> Result<(), StoreError> {
        let path = self.hash_path(supplier)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        writeln!(tmp, "{hash}")?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(supplier, path = %path.display(), "hash saved");
        Ok(())
    }

    fn load_snapshot(&self, supplier: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.snapshot_path(supplier)?;
        if !path.exists() {
            return Ok(None);
        }
        read_snapshot(&path).map(Some)
    }

    fn save_snapshot(&self, supplier: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.snapshot_path(supplier)?;
        write_snapshot(&path, snapshot)?;
        debug!(supplier, items = snapshot.len(), path = %path.display(), "snapshot saved");
        Ok(())
    }
}

/// Supplier ids become file names; reject anything that could escape the
/// state directory.
fn checked_key(supplier: &str) -> Result<&str, StoreError> {
    let bad = supplier.is_empty()
        || supplier == "."
        || supplier == ".."
        || supplier.contains(['/', '\\', '\0']);
    if bad {
        Err(StoreError::InvalidKey(supplier.to_string()))
    } else {
        Ok(supplier)
    }
}

impl StateStore for FsStateStore {
    fn read_hash(&self, supplier: &str) -> Result<Option<String>, BoxError> {
        Ok(self.load_hash(supplier)?)
    }

    fn write_hash(&self, supplier: &str, hash: &str) -> Result<(), BoxError> {
        Ok(self.save_hash(supplier, hash)?)
    }

    fn read_snapshot(&self, supplier: &str) -> Result<Option<Snapshot>, BoxError> {
        Ok(self.load_snapshot(supplier)?)
    }

    fn write_snapshot(&self, supplier: &str, snapshot: &Snapshot) -> Result<(), BoxError> {
        Ok(self.save_snapshot(supplier, snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::SnapshotEntry;
    use tempfile::TempDir;

    #[test]
    fn open_creates_state_dir() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::open(tmp.path()).unwrap();
        assert!(store.dir().is_dir());
        assert!(store.dir().ends_with(STATE_DIR));
    }

    #[test]
    fn hash_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::open(tmp.path()).unwrap();
        assert_eq!(store.read_hash("IMSA").unwrap(), None);

        store.write_hash("IMSA", "deadbeef").unwrap();
        assert_eq!(store.read_hash("IMSA").unwrap().as_deref(), Some("deadbeef"));
        assert!(tmp.path().join("_state/IMSA.sha256").exists());

        store.write_hash("IMSA", "cafe").unwrap();
        assert_eq!(store.read_hash("IMSA").unwrap().as_deref(), Some("cafe"));
    }

    #[test]
    fn snapshot_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::open(tmp.path()).unwrap();
        assert_eq!(store.read_snapshot("Tevelam").unwrap(), None);

        let mut snap = Snapshot::new();
        snap.insert(
            "F100".into(),
            SnapshotEntry {
                price: Some(10.0),
                currency: Some("USD".into()),
            },
        );
        store.write_snapshot("Tevelam", &snap).unwrap();
        assert!(tmp.path().join("_state/Tevelam_snapshot.parquet").exists());
        assert_eq!(store.read_snapshot("Tevelam").unwrap(), Some(snap));
    }

    #[test]
    fn state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        FsStateStore::open(tmp.path())
            .unwrap()
            .write_hash("A", "1")
            .unwrap();
        let reopened = FsStateStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.read_hash("A").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::open(tmp.path()).unwrap();
        assert!(store.write_hash("../escape", "x").is_err());
        assert!(store.read_snapshot("").is_err());
        assert!(store.read_hash("..").is_err());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::open(tmp.path()).unwrap();
        std::fs::write(store.snapshot_path("X").unwrap(), b"not parquet").unwrap();
        assert!(store.read_snapshot("X").is_err());
    }
}
