//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! nothing reads process-wide environment variables during request handling.

use crate::constants::SNAPSHOT_FILENAME;
use crate::{RegistryError, RegistryResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir` enables snapshot persistence. It may not exist yet (it is created on the first
    /// write) but must not be an existing non-directory path.
    pub fn new(data_dir: Option<PathBuf>) -> RegistryResult<Self> {
        if let Some(dir) = &data_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(RegistryError::InvalidInput(format!(
                    "data directory is not a directory: {}",
                    dir.display()
                )));
            }
        }

        Ok(Self { data_dir })
    }

    /// A configuration with no persistence; state lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(SNAPSHOT_FILENAME))
    }
}

/// Parse the data directory from an optional environment value.
///
/// `None` or empty/whitespace means "no persistence".
pub fn data_dir_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
