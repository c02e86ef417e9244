// Common test utilities for store integration tests

use litekv::{MemoryAuditSink, Store, StoreConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a scratch directory for one store
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
    pub backup_dir: PathBuf,
    pub audit: MemoryAuditSink,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().join("db.json");
        let backup_dir = temp_dir.path().join("backups");

        Self {
            temp_dir,
            data_path,
            backup_dir,
            audit: MemoryAuditSink::new(),
        }
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig::new(&self.data_path).with_backup_dir(&self.backup_dir)
    }

    pub fn open(&self) -> Store {
        Store::open_with_sink(self.config(), self.audit.clone()).expect("Failed to open store")
    }

    #[allow(dead_code)]
    pub fn open_encrypted(&self) -> Store {
        Store::open_with_sink(self.config().encrypted(), self.audit.clone())
            .expect("Failed to open encrypted store")
    }

    #[allow(dead_code)]
    pub fn backup_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.backup_dir)
            .expect("Failed to read backup directory")
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|e| e.file_name().to_str().map(String::from))
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
