//! Store configuration

use crate::SecurityMode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default directory for backup snapshots
pub const DEFAULT_BACKUP_DIR: &str = "backups";

/// Default number of backups kept by rotation
pub const DEFAULT_RETENTION_LIMIT: usize = 5;

/// Suffix appended to the storage path for the key file
const KEY_SUFFIX: &str = ".key";

/// Suffix appended to the storage path for the commit temp file
const TEMP_SUFFIX: &str = ".tmp";

/// Configuration for a LiteKV store.
///
/// # Examples
///
/// ```
/// use litekv_core::{SecurityMode, StoreConfig};
///
/// let config = StoreConfig::new("data.json")
///     .encrypted()
///     .with_backup_dir("snapshots")
///     .with_retention(3);
/// assert_eq!(config.security_mode, SecurityMode::Encrypted);
/// assert_eq!(config.retention_limit, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the primary data file
    pub storage_path: PathBuf,
    /// Directory that receives backup snapshots
    pub backup_dir: PathBuf,
    /// Maximum number of backups kept after a save with backup
    pub retention_limit: usize,
    /// Security mode the data file is expected to use
    pub security_mode: SecurityMode,
}

impl StoreConfig {
    /// Create a plain-mode config for the given storage path.
    ///
    /// A leading `~/` in either path is expanded against `$HOME`.
    pub fn new(storage_path: impl AsRef<Path>) -> Self {
        Self {
            storage_path: expand_home(storage_path.as_ref()),
            backup_dir: expand_home(Path::new(DEFAULT_BACKUP_DIR)),
            retention_limit: DEFAULT_RETENTION_LIMIT,
            security_mode: SecurityMode::Plain,
        }
    }

    /// Enable encryption at rest
    pub fn encrypted(self) -> Self {
        self.with_security_mode(SecurityMode::Encrypted)
    }

    /// Set the security mode
    pub fn with_security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Set the backup directory
    pub fn with_backup_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.backup_dir = expand_home(dir.as_ref());
        self
    }

    /// Set the backup retention limit
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retention_limit = limit;
        self
    }

    /// Path of the key file (`<storage_path>.key`)
    pub fn key_path(&self) -> PathBuf {
        with_suffix(&self.storage_path, KEY_SUFFIX)
    }

    /// Path of the temp file used by atomic commits (`<storage_path>.tmp`)
    pub fn temp_path(&self) -> PathBuf {
        with_suffix(&self.storage_path, TEMP_SUFFIX)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Expand a leading `~` component using `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
