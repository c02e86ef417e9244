//! # LiteKV Storage Engine
//!
//! Owns the data file: initial load with security-mode verification and
//! atomic commits.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of LiteKV.**
//! Depend on the main `litekv` crate instead.
//!
//! ---
//!
//! ## Commit protocol
//!
//! ```text
//! encode(map) → <path>.tmp → fsync → rename(<path>.tmp, <path>) → [backup → rotate]
//! ```
//!
//! The data file is always either the previous complete state or the new
//! complete state. A crash between the temp write and the rename leaves only
//! a stale temp file, which the next open discards.

#![warn(missing_docs)]
#![warn(clippy::all)]

use litekv_backup::{BackupInfo, BackupManager};
use litekv_codec::{detect_mode, Codec};
use litekv_core::{Document, Error, Result, StoreConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// What the initial load found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No data file, or a zero-length one: a new, empty database
    Created,
    /// Existing data decoded successfully
    Loaded {
        /// Number of keys read
        entries: usize,
    },
}

/// Result of a successful commit
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Size of the committed data file
    pub bytes_written: u64,
    /// Backup created alongside the commit
    pub backup: Option<BackupInfo>,
    /// Backups deleted by rotation
    pub rotated: Vec<String>,
    /// Backup or rotation failure; the commit itself still stands
    pub backup_error: Option<Error>,
}

/// Load/save engine for one data file
#[derive(Debug)]
pub struct StorageEngine {
    /// Configuration
    config: StoreConfig,
    /// Codec for the configured security mode
    codec: Codec,
    /// Backup manager for the configured backup directory
    backups: BackupManager,
}

impl StorageEngine {
    /// Prepare the engine: key setup in encrypted mode and backup directory
    /// creation.
    ///
    /// Errors here are configuration errors; the store must not be built.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let codec = Codec::for_config(&config)?;
        let backups = BackupManager::new(&config.backup_dir)?;
        Ok(Self {
            config,
            codec,
            backups,
        })
    }

    /// Configuration this engine was built from
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The codec in use
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The backup manager
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.config.storage_path
    }

    /// Read and decode the data file.
    ///
    /// A missing or empty file yields an empty map. The file's detected
    /// security mode must match the configured one; a mismatch fails with
    /// [`Error::SecurityModeMismatch`] before any bytes are decoded.
    ///
    /// A stale temp file from an interrupted save is deleted only once the
    /// load succeeds; a failed load leaves the disk as it was.
    pub fn load(&self) -> Result<(Document, LoadOutcome)> {
        let loaded = self.read_data_file()?;
        self.discard_stale_temp();
        Ok(loaded)
    }

    fn read_data_file(&self) -> Result<(Document, LoadOutcome)> {
        let path = self.path();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?path, "database created");
                return Ok((Document::new(), LoadOutcome::Created));
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            tracing::info!(path = ?path, "database created (empty file)");
            return Ok((Document::new(), LoadOutcome::Created));
        }

        let detected = detect_mode(&bytes);
        let configured = self.codec.mode();
        if detected != configured {
            return Err(Error::SecurityModeMismatch {
                detected,
                configured,
            });
        }

        let map = self.codec.decode(&bytes)?;
        let entries = map.len();
        tracing::info!(path = ?path, entries, mode = %configured, "database loaded");
        Ok((map, LoadOutcome::Loaded { entries }))
    }

    /// Encode `map` and write it to the temp file, fsynced, without touching
    /// the data file. Returns the temp path.
    pub fn stage(&self, map: &Document) -> Result<PathBuf> {
        let bytes = self.codec.encode(map)?;
        self.stage_bytes(&bytes)?;
        Ok(self.config.temp_path())
    }

    fn stage_bytes(&self, bytes: &[u8]) -> Result<()> {
        let temp = self.config.temp_path();
        if let Some(parent) = temp.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(&temp)?;
        let written = file.write_all(bytes).and_then(|_| file.sync_all());
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Atomically replace the data file with the staged temp file.
    pub fn promote(&self) -> Result<()> {
        let temp = self.config.temp_path();
        if let Err(e) = fs::rename(&temp, self.path()) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        sync_parent_dir(self.path());
        Ok(())
    }

    /// Commit `map` to disk.
    ///
    /// With `backup` set, a backup of the committed bytes is written after
    /// the rename and the backup directory is rotated down to `retention`.
    /// On error the data file is untouched.
    pub fn save(&self, map: &Document, backup: bool, retention: usize) -> Result<SaveReport> {
        let bytes = self.codec.encode(map)?;

        if let Err(e) = self.stage_bytes(&bytes).and_then(|_| self.promote()) {
            tracing::error!(path = ?self.path(), error = %e, "failed to write database to disk");
            return Err(e);
        }
        tracing::debug!(path = ?self.path(), bytes = bytes.len(), entries = map.len(), "database committed");

        let mut report = SaveReport {
            bytes_written: bytes.len() as u64,
            ..Default::default()
        };
        if backup {
            match self.backup_and_rotate(&bytes, retention) {
                Ok((info, rotated)) => {
                    report.backup = Some(info);
                    report.rotated = rotated;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to create backup");
                    report.backup_error = Some(e);
                }
            }
        }
        Ok(report)
    }

    fn backup_and_rotate(&self, bytes: &[u8], retention: usize) -> Result<(BackupInfo, Vec<String>)> {
        let info = self.backups.create_backup(bytes)?;
        let rotated = self.backups.cleanup_backups(retention)?;
        Ok((info, rotated))
    }

    /// Decode a backup with this engine's codec.
    pub fn read_backup(&self, name: &str) -> Result<Document> {
        let bytes = self.backups.read_backup(name)?;
        self.codec.decode(&bytes)
    }

    fn discard_stale_temp(&self) {
        let temp = self.config.temp_path();
        if temp.is_file() {
            tracing::warn!(path = ?temp, "discarding stale temp file from an interrupted save");
            let _ = fs::remove_file(&temp);
        }
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
