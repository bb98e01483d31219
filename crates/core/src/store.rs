//! JSON snapshot persistence for the registry.
//!
//! The whole registry is written to `<data_dir>/registry.json` after every successful mutation.
//! Writes go to a temporary file first and are then renamed over the snapshot, so a crash mid
//! write leaves the previous snapshot intact.
//!
//! ```text
//! <data_dir>/
//!   registry.json       # current snapshot
//!   registry.json.tmp   # only present while a write is in flight
//! ```

use crate::constants::{SNAPSHOT_FILENAME, SNAPSHOT_TMP_FILENAME, SNAPSHOT_VERSION};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::RecordsRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    written_at: DateTime<Utc>,
    registry: &'a RecordsRegistry,
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    #[allow(dead_code)]
    written_at: DateTime<Utc>,
    registry: RecordsRegistry,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILENAME)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_TMP_FILENAME)
    }

    /// Loads the registry, or an empty one when no snapshot has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or parsed, has an unknown version, or
    /// violates the registry invariants.
    pub fn load(&self) -> RegistryResult<RecordsRegistry> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(RecordsRegistry::new());
        }

        let contents = fs::read_to_string(&path).map_err(RegistryError::FileRead)?;
        let snapshot: SnapshotIn =
            serde_json::from_str(&contents).map_err(RegistryError::Deserialization)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RegistryError::CorruptSnapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        snapshot.registry.check_consistency()?;

        Ok(snapshot.registry)
    }

    /// Atomically replaces the snapshot with `registry`.
    pub fn save(&self, registry: &RecordsRegistry) -> RegistryResult<()> {
        ensure_dir(&self.dir)?;

        let snapshot = SnapshotOut {
            version: SNAPSHOT_VERSION,
            written_at: Utc::now(),
            registry,
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(RegistryError::Serialization)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(RegistryError::FileWrite)?;
        fs::rename(&tmp, self.snapshot_path()).map_err(RegistryError::FileWrite)?;

        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> RegistryResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(RegistryError::StorageDirCreation)
}
