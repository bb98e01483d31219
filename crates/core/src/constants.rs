//! Constants used throughout the HRM core crate.

/// Filename of the JSON snapshot written under the data directory.
pub const SNAPSHOT_FILENAME: &str = "registry.json";

/// Temporary filename used while a new snapshot is being written.
pub const SNAPSHOT_TMP_FILENAME: &str = "registry.json.tmp";

/// Snapshot format version. Bump when the persisted layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default data directory for the CLI when none is given.
pub const DEFAULT_DATA_DIR: &str = "hrm_data";
