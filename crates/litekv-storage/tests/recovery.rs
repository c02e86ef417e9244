// Crash-consistency and security-mode tests for the storage engine

mod common;

use common::StoreFixture;
use litekv_core::{Document, Error, SecurityMode};
use litekv_storage::{LoadOutcome, StorageEngine};
use serde_json::json;
use std::fs;

fn map_of(pairs: &[(&str, serde_json::Value)]) -> Document {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_crash_before_rename_leaves_primary_intact() {
    let fixture = StoreFixture::new();
    let engine = StorageEngine::new(fixture.config()).expect("Failed to create engine");

    let old = map_of(&[("a", json!(1))]);
    engine.save(&old, false, 5).expect("Failed to save");
    let committed = fixture.data_bytes();

    // Stage the new state but "crash" before the rename
    let new = map_of(&[("a", json!(2)), ("b", json!(true))]);
    let temp = engine.stage(&new).expect("Failed to stage");
    assert!(temp.exists());
    assert_eq!(fixture.data_bytes(), committed);
    drop(engine);

    // Restart: the previous complete state is what loads
    let engine = StorageEngine::new(fixture.config()).expect("Failed to reopen engine");
    let (loaded, _) = engine.load().expect("Failed to load");
    assert_eq!(loaded, old);
    assert!(!temp.exists(), "stale temp file should be discarded");
}

#[test]
fn test_rename_publishes_exact_encoding() {
    let fixture = StoreFixture::new();
    let engine = StorageEngine::new(fixture.config()).expect("Failed to create engine");

    let new = map_of(&[("x", json!({"nested": [1, 2, 3]}))]);
    engine.stage(&new).expect("Failed to stage");
    engine.promote().expect("Failed to promote");

    let expected = engine.codec().encode(&new).expect("Failed to encode");
    assert_eq!(fixture.data_bytes(), expected);
}

#[test]
fn test_failed_temp_write_leaves_primary_untouched() {
    let fixture = StoreFixture::new();
    let config = fixture.config();
    let engine = StorageEngine::new(config.clone()).expect("Failed to create engine");

    let old = map_of(&[("keep", json!("me"))]);
    engine.save(&old, false, 5).expect("Failed to save");
    let committed = fixture.data_bytes();

    // A directory squatting on the temp path makes the temp write fail
    fs::create_dir(config.temp_path()).expect("Failed to create blocker");

    let result = engine.save(&map_of(&[("lost", json!(0))]), true, 5);
    assert!(result.is_err());
    assert_eq!(fixture.data_bytes(), committed);
    assert!(fixture.list_backups().is_empty(), "no backup for a failed save");
}

#[test]
fn test_encrypted_file_with_plain_config_is_rejected() {
    let fixture = StoreFixture::new();
    {
        let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to create engine");
        engine
            .save(&map_of(&[("secret", json!("s3cr3t"))]), false, 5)
            .expect("Failed to save");
    }

    let engine = StorageEngine::new(fixture.config()).expect("Failed to create engine");
    match engine.load() {
        Err(Error::SecurityModeMismatch {
            detected,
            configured,
        }) => {
            assert_eq!(detected, SecurityMode::Encrypted);
            assert_eq!(configured, SecurityMode::Plain);
        }
        other => panic!("expected mode mismatch, got {other:?}"),
    }
}

#[test]
fn test_plain_file_with_encrypted_config_is_rejected() {
    let fixture = StoreFixture::new();
    fs::write(&fixture.data_path, br#"{"a":1}"#).expect("Failed to write data");
    // Key must already exist, otherwise setup itself refuses to run
    litekv_codec::EncryptionKey::generate()
        .save(fixture.config().key_path())
        .expect("Failed to save key");

    let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to create engine");
    let err = engine.load().unwrap_err();
    assert!(matches!(err, Error::SecurityModeMismatch { .. }));
    assert!(err.to_string().contains("data is plaintext but encryption enabled"));
}

#[test]
fn test_encrypted_roundtrip_across_restart() {
    let fixture = StoreFixture::new();
    let map = map_of(&[("token", json!("abc")), ("n", json!(42))]);
    {
        let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to create engine");
        engine.save(&map, true, 5).expect("Failed to save");
    }
    assert!(!fixture.data_bytes().starts_with(b"{"));

    let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to reopen engine");
    let (loaded, outcome) = engine.load().expect("Failed to load");
    assert_eq!(loaded, map);
    assert_eq!(outcome, LoadOutcome::Loaded { entries: 2 });

    // Backups carry the sealed bytes and decode with the same key
    let name = engine.backups().list_backups().unwrap().pop().unwrap();
    assert_eq!(engine.read_backup(&name).expect("Failed to read backup"), map);
}

#[test]
fn test_missing_key_for_existing_encrypted_data_is_fatal() {
    let fixture = StoreFixture::new();
    {
        let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to create engine");
        engine.save(&Document::new(), false, 5).expect("Failed to save");
    }
    fs::remove_file(fixture.config().key_path()).expect("Failed to delete key");

    let err = StorageEngine::new(fixture.config().encrypted()).unwrap_err();
    assert!(err.is_fatal());
    assert!(
        !fixture.config().key_path().exists(),
        "a replacement key must never be generated"
    );
}

#[test]
fn test_tampered_encrypted_file_fails_decryption() {
    let fixture = StoreFixture::new();
    let engine = StorageEngine::new(fixture.config().encrypted()).expect("Failed to create engine");
    engine
        .save(&map_of(&[("a", json!(1))]), false, 5)
        .expect("Failed to save");

    let mut bytes = fixture.data_bytes();
    let mid = bytes.len() / 2 + 10;
    bytes[mid] ^= 0xff;
    fs::write(&fixture.data_path, &bytes).expect("Failed to tamper");

    assert!(matches!(engine.load(), Err(Error::Decryption(_))));
}

#[test]
fn test_rotation_keeps_most_recent() {
    let fixture = StoreFixture::new();
    let engine = StorageEngine::new(fixture.config()).expect("Failed to create engine");

    let mut all = Vec::new();
    for i in 0..7 {
        let report = engine
            .save(&map_of(&[("i", json!(i))]), true, 3)
            .expect("Failed to save");
        all.push(report.backup.expect("backup expected").name);
    }

    let remaining = engine.backups().list_backups().unwrap();
    assert_eq!(remaining.len(), 3);
    assert_eq!(remaining, all[4..].to_vec());

    let newest = engine.read_backup(remaining.last().unwrap()).unwrap();
    assert_eq!(newest["i"], json!(6));
}
