//! # LiteKV Backup Manager
//!
//! Timestamped backups of the encoded map, with rotation.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of LiteKV.**
//! Depend on the main `litekv` crate instead.
//!
//! ---
//!
//! Backups are opaque byte blobs produced by the codec: the manager never
//! looks inside them, so a backup taken from an encrypted store stays
//! encrypted. Files are named `backup_<YYYYMMDD_HHMMSS>.json` from the local
//! capture time. A second backup within the same second gets a `_<n>` suffix
//! instead of replacing the first.
//!
//! ## Usage
//!
//! ```no_run
//! use litekv_backup::BackupManager;
//!
//! let manager = BackupManager::new("backups")?;
//! let info = manager.create_backup(br#"{"a":1}"#)?;
//! println!("Backup created at: {}", info.path.display());
//! manager.cleanup_backups(5)?;
//! # Ok::<(), litekv_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{Local, NaiveDateTime};
use litekv_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub mod naming;

pub use naming::BackupName;

/// Backup configuration
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Re-read every backup after writing and compare CRC32 checksums
    pub verify_checksums: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Metadata about a backup that was just written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// File name inside the backup directory
    pub name: String,
    /// Full path of the backup file
    pub path: PathBuf,
    /// Capture time (local, second resolution)
    pub captured_at: NaiveDateTime,
    /// Size in bytes
    pub size: u64,
    /// CRC32 of the contents
    pub checksum: u32,
}

/// Backup manager for one backup directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Backup directory
    dir: PathBuf,
    /// Configuration
    config: BackupConfig,
}

impl BackupManager {
    /// Create a manager, creating the directory if it does not exist
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(dir, BackupConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(dir: impl AsRef<Path>, config: BackupConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, config })
    }

    /// The backup directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `contents` as a new backup stamped with the current local time.
    pub fn create_backup(&self, contents: &[u8]) -> Result<BackupInfo> {
        self.create_backup_at(contents, Local::now().naive_local())
    }

    /// Write `contents` as a new backup stamped with `captured_at`.
    pub fn create_backup_at(
        &self,
        contents: &[u8],
        captured_at: NaiveDateTime,
    ) -> Result<BackupInfo> {
        fs::create_dir_all(&self.dir)?;

        // Never reuse a slot freed by rotation: it would sort before newer backups
        let base = BackupName::new(captured_at);
        let mut name = match self
            .parsed_backups()?
            .into_iter()
            .filter(|n| n.captured_at() == base.captured_at())
            .max()
        {
            Some(latest) => latest.next().ok_or_else(|| exhausted(&base))?,
            None => base,
        };
        let (path, mut file) = loop {
            let path = self.dir.join(name.file_name());
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    name = name.next().ok_or_else(|| exhausted(&base))?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let written = file
            .write_all(contents)
            .and_then(|_| file.sync_all());
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        let checksum = crc32fast::hash(contents);
        if self.config.verify_checksums {
            let copied = crc32fast::hash(&fs::read(&path)?);
            if copied != checksum {
                let _ = fs::remove_file(&path);
                return Err(Error::Corruption(format!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    name.file_name(),
                    checksum,
                    copied
                )));
            }
        }

        tracing::info!(path = ?path, size = contents.len(), "backup created");

        Ok(BackupInfo {
            name: name.file_name(),
            path,
            captured_at: name.captured_at(),
            size: contents.len() as u64,
            checksum,
        })
    }

    /// Backup file names, oldest first.
    ///
    /// Files in the directory that do not follow the backup naming scheme
    /// are ignored.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        Ok(self
            .parsed_backups()?
            .into_iter()
            .map(|n| n.file_name())
            .collect())
    }

    fn parsed_backups(&self) -> Result<Vec<BackupName>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(parsed) = entry.file_name().to_str().and_then(BackupName::parse) {
                names.push(parsed);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete the oldest backups so that at most `limit` remain.
    ///
    /// Returns the names of the deleted backups.
    pub fn cleanup_backups(&self, limit: usize) -> Result<Vec<String>> {
        let backups = self.list_backups()?;
        if backups.len() <= limit {
            return Ok(Vec::new());
        }

        let excess = backups.len() - limit;
        let mut removed = Vec::with_capacity(excess);
        for name in backups.into_iter().take(excess) {
            fs::remove_file(self.dir.join(&name))?;
            tracing::debug!(backup = %name, "rotated out old backup");
            removed.push(name);
        }
        Ok(removed)
    }

    /// Full path of a backup after validating its name.
    pub fn backup_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.contains('\0')
        {
            return Err(Error::InvalidInput(format!(
                "invalid backup name: {name:?}"
            )));
        }
        Ok(self.dir.join(name))
    }

    /// Read a backup's raw contents.
    pub fn read_backup(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.backup_path(name)?;
        if !path.is_file() {
            return Err(Error::BackupNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }
}

fn exhausted(base: &BackupName) -> Error {
    Error::InvalidInput(format!(
        "no free backup suffix left for {}",
        base.file_name()
    ))
}
