// Common test utilities for storage engine integration tests

use litekv_core::StoreConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture with a scratch directory holding the data file and backups
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
    pub backup_path: PathBuf,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().join("store.json");
        let backup_path = temp_dir.path().join("backups");

        Self {
            temp_dir,
            data_path,
            backup_path,
        }
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig::new(&self.data_path).with_backup_dir(&self.backup_path)
    }

    #[allow(dead_code)]
    pub fn data_bytes(&self) -> Vec<u8> {
        fs::read(&self.data_path).expect("Failed to read data file")
    }

    #[allow(dead_code)]
    pub fn list_backups(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.backup_path)
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
