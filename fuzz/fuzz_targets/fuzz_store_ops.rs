#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use litekv::{MemoryAuditSink, Store, StoreConfig};

#[derive(Arbitrary, Debug)]
enum StoreOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
    Purge,
    SearchKey { needle: String },
    SearchValue { needle: String },
    Fuzzy { query: String, threshold: u8 },
    Save,
}

fuzz_target!(|ops: Vec<StoreOp>| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let config = StoreConfig::new(dir.path().join("db.json")).with_backup_dir(dir.path().join("backups"));
    let Ok(mut store) = Store::open_with_sink(config, MemoryAuditSink::new()) else {
        return;
    };

    // Limit operations to prevent timeout
    for op in ops.iter().take(100) {
        match op {
            StoreOp::Set { key, value } => {
                let _ = store.set(key, value.as_str());
            }
            StoreOp::Get { key } => {
                let _ = store.get(key);
            }
            StoreOp::Remove { key } => {
                let _ = store.remove(key);
            }
            StoreOp::Purge => {
                let _ = store.purge();
            }
            StoreOp::SearchKey { needle } => {
                let _ = store.search_by_key(needle);
            }
            StoreOp::SearchValue { needle } => {
                let _ = store.search_by_value(needle);
            }
            StoreOp::Fuzzy { query, threshold } => {
                let found = store.fuzzy_search(query, f64::from(*threshold));
                assert!(found.len() <= 5);
            }
            StoreOp::Save => {
                let _ = store.save();
            }
        }
    }
});
