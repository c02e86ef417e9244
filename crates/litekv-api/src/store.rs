//! The store: map operations over the loaded document.

use crate::fuzzy::{self, FuzzyMatch};
use crate::security;
use litekv_core::audit::ALL_KEYS;
use litekv_core::{
    AuditAction, AuditEvent, AuditSink, Document, Error, StoreConfig, TracingAuditSink, Value,
};
use litekv_storage::{LoadOutcome, SaveReport, StorageEngine};
use std::sync::{Arc, RwLock};

/// A store shared between threads. Take the write lock for every mutation,
/// `save` and `restore` included.
pub type SharedStore = Arc<RwLock<Store>>;

/// A file-backed key-value store of JSON values.
///
/// Every operation first checks the usability gate. A store whose data file
/// failed to load is gated: reads return nothing, writes return `false`, and
/// neither memory nor disk changes. [`Store::last_error`] tells why.
///
/// Nothing is written to disk until [`Store::save`] (or a variant) is called;
/// dropping the store does not flush.
///
/// # Examples
///
/// ```no_run
/// use litekv::{Store, StoreConfig};
/// use serde_json::json;
///
/// let mut store = Store::open(StoreConfig::new("data.json"))?;
/// store.set("a", json!(1));
/// assert!(store.save_with_backup());
/// assert_eq!(store.get("a"), Some(&json!(1)));
/// # Ok::<(), litekv::Error>(())
/// ```
pub struct Store {
    engine: StorageEngine,
    map: Document,
    usable: bool,
    load_outcome: Option<LoadOutcome>,
    last_error: Option<Error>,
    audit: Box<dyn AuditSink>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.engine.path())
            .field("entries", &self.map.len())
            .field("usable", &self.usable)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Store {
    /// Open a store, auditing to `tracing`.
    ///
    /// Configuration errors (missing key file for existing encrypted data,
    /// security-mode mismatch) abort with an error. Any other load failure
    /// produces a gated store.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        Self::open_with_sink(config, TracingAuditSink)
    }

    /// Open a store with a custom audit sink.
    pub fn open_with_sink(
        config: StoreConfig,
        sink: impl AuditSink + 'static,
    ) -> Result<Self, Error> {
        Self::open_inner(config, Box::new(sink), true)
    }

    /// Like [`Store::open_with_sink`], but a security-mode mismatch yields a
    /// gated store instead of an error. The map is never populated from
    /// bytes written under the other mode.
    pub fn open_degraded(
        config: StoreConfig,
        sink: impl AuditSink + 'static,
    ) -> Result<Self, Error> {
        Self::open_inner(config, Box::new(sink), false)
    }

    fn open_inner(
        config: StoreConfig,
        audit: Box<dyn AuditSink>,
        strict: bool,
    ) -> Result<Self, Error> {
        let engine = StorageEngine::new(config)?;
        let mut store = Self {
            engine,
            map: Document::new(),
            usable: false,
            load_outcome: None,
            last_error: None,
            audit,
        };

        match store.engine.load() {
            Ok((map, outcome)) => {
                store.map = map;
                store.usable = true;
                store.load_outcome = Some(outcome);
            }
            Err(e) if strict && e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(path = ?store.engine.path(), error = %e, "failed to load database; store is unavailable");
                store.last_error = Some(e);
            }
        }
        Ok(store)
    }

    // ========== Gate & status ==========

    /// Whether the store loaded correctly and accepts operations
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// What the initial load found; `None` for a gated store
    pub fn load_outcome(&self) -> Option<LoadOutcome> {
        self.load_outcome
    }

    /// The most recent load, save, restore or input failure
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        self.engine.config()
    }

    fn gate(&self, op: &'static str) -> bool {
        if !self.usable {
            tracing::warn!(op, "store is unavailable; operation ignored");
        }
        self.usable
    }

    fn emit(&self, event: AuditEvent) {
        self.audit.record(&event);
    }

    fn fail(&mut self, op: &'static str, error: Error) {
        tracing::warn!(op, error = %error, "operation failed");
        self.last_error = Some(error);
    }

    // ========== Single-key operations ==========

    /// Insert or overwrite a key. Returns `false` only when gated or the key
    /// is rejected by validation.
    pub fn set(&mut self, key: impl ToString, value: impl Into<Value>) -> bool {
        if !self.gate("set") {
            return false;
        }
        self.insert(key.to_string(), value.into(), AuditAction::Set)
    }

    fn insert(&mut self, key: String, value: Value, action: AuditAction) -> bool {
        if let Err(e) = security::validate_key(&key) {
            self.fail("set", e);
            return false;
        }
        self.emit(AuditEvent::new(action, key.clone()).with_value(value.clone()));
        self.map.insert(key, value);
        true
    }

    /// Look up a key
    pub fn get(&self, key: impl ToString) -> Option<&Value> {
        if !self.gate("get") {
            return None;
        }
        self.map.get(&key.to_string())
    }

    /// Whether a key is present
    pub fn contains(&self, key: impl ToString) -> bool {
        self.get(key).is_some()
    }

    /// Delete a key. Returns `true` if it existed.
    pub fn remove(&mut self, key: impl ToString) -> bool {
        if !self.gate("remove") {
            return false;
        }
        self.delete(key.to_string(), AuditAction::Remove)
    }

    fn delete(&mut self, key: String, action: AuditAction) -> bool {
        if self.map.shift_remove(&key).is_none() {
            return false;
        }
        self.emit(AuditEvent::new(action, key));
        true
    }

    /// Clear the whole map
    pub fn purge(&mut self) -> bool {
        if !self.gate("purge") {
            return false;
        }
        self.map.clear();
        self.emit(AuditEvent::new(AuditAction::Purge, ALL_KEYS));
        true
    }

    // ========== Bulk operations ==========

    /// Insert several entries, one audit event per key.
    ///
    /// Not atomic: entries before a rejected key stay applied. Returns
    /// `true` if every entry was applied.
    pub fn set_many<I, K, V>(&mut self, entries: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: Into<Value>,
    {
        if !self.gate("set_many") {
            return false;
        }
        let mut all_applied = true;
        for (key, value) in entries {
            all_applied &= self.insert(key.to_string(), value.into(), AuditAction::SetMany);
        }
        all_applied
    }

    /// Delete several keys, one audit event per key removed. Returns how
    /// many keys existed.
    pub fn remove_many<I, K>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: ToString,
    {
        if !self.gate("remove_many") {
            return 0;
        }
        keys.into_iter()
            .filter(|key| self.delete(key.to_string(), AuditAction::RemoveMany))
            .count()
    }

    // ========== Scans ==========

    /// All keys in map order
    pub fn all(&self) -> Vec<String> {
        if !self.gate("all") {
            return Vec::new();
        }
        self.map.keys().cloned().collect()
    }

    /// Number of keys (0 when gated)
    pub fn len(&self) -> usize {
        if self.usable {
            self.map.len()
        } else {
            0
        }
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys containing `substring` (case-sensitive)
    pub fn search_by_key(&self, substring: &str) -> Vec<String> {
        if !self.gate("search_by_key") {
            return Vec::new();
        }
        self.map
            .keys()
            .filter(|key| key.contains(substring))
            .cloned()
            .collect()
    }

    /// Keys whose value's text contains `needle`.
    ///
    /// Strings are searched as-is; every other value as its compact JSON.
    pub fn search_by_value(&self, needle: &str) -> Vec<String> {
        if !self.gate("search_by_value") {
            return Vec::new();
        }
        self.map
            .iter()
            .filter(|(_, value)| value_text(value).contains(needle))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Entries whose value satisfies `predicate`, in map order
    pub fn filter(&self, predicate: impl Fn(&Value) -> bool) -> Document {
        if !self.gate("filter") {
            return Document::new();
        }
        self.map
            .iter()
            .filter(|(_, value)| predicate(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Up to five keys similar to `query`, best first.
    ///
    /// `threshold` is on a 0–100 scale; see [`crate::fuzzy`].
    pub fn fuzzy_search(&self, query: &str, threshold: f64) -> Vec<String> {
        self.fuzzy_matches(query, threshold)
            .into_iter()
            .map(|m| m.key)
            .collect()
    }

    /// [`Store::fuzzy_search`] with scores
    pub fn fuzzy_matches(&self, query: &str, threshold: f64) -> Vec<FuzzyMatch> {
        if !self.gate("fuzzy_search") {
            return Vec::new();
        }
        if let Err(e) = security::validate_threshold(threshold) {
            tracing::warn!(error = %e, "fuzzy search rejected");
            return Vec::new();
        }
        fuzzy::rank(&self.map, query, threshold)
    }

    // ========== Persistence ==========

    /// Commit the map to disk without a backup
    pub fn save(&mut self) -> bool {
        self.commit(false, self.config().retention_limit)
    }

    /// Commit the map, then back it up and rotate to the configured
    /// retention limit
    pub fn save_with_backup(&mut self) -> bool {
        self.commit(true, self.config().retention_limit)
    }

    /// Commit the map; with `backup`, also back up and rotate down to
    /// `retention` backups.
    ///
    /// Returns `false` if the data file could not be written, in which case
    /// it still holds the previous state. A backup failure after a good
    /// commit still returns `true` and is recorded in [`Store::last_error`].
    pub fn commit(&mut self, backup: bool, retention: usize) -> bool {
        self.commit_report(backup, retention).is_some()
    }

    fn commit_report(&mut self, backup: bool, retention: usize) -> Option<SaveReport> {
        if !self.gate("save") {
            return None;
        }
        match self.engine.save(&self.map, backup, retention) {
            Ok(mut report) => {
                if let Some(e) = report.backup_error.take() {
                    self.last_error = Some(e);
                }
                Some(report)
            }
            Err(e) => {
                self.fail("save", e);
                None
            }
        }
    }

    // ========== Backups ==========

    /// Backup file names, oldest first. Empty when gated or unreadable.
    pub fn list_backups(&self) -> Vec<String> {
        if !self.gate("list_backups") {
            return Vec::new();
        }
        match self.engine.backups().list_backups() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(op = "list_backups", error = %e, "operation failed");
                Vec::new()
            }
        }
    }

    /// Delete the oldest backups beyond `limit`. Returns how many were deleted.
    pub fn cleanup_backups(&mut self, limit: usize) -> usize {
        if !self.gate("cleanup_backups") {
            return 0;
        }
        match self.engine.backups().cleanup_backups(limit) {
            Ok(removed) => removed.len(),
            Err(e) => {
                self.fail("cleanup_backups", e);
                0
            }
        }
    }

    /// Replace the live map with a backup and commit it without taking a new
    /// backup.
    ///
    /// Returns `false` if the backup is missing or cannot be decoded (the
    /// map is then unchanged) or if the commit fails (the map holds the
    /// restored state, the data file the previous one).
    pub fn restore(&mut self, backup_name: &str) -> bool {
        if !self.gate("restore") {
            return false;
        }
        let restored = match self.engine.read_backup(backup_name) {
            Ok(map) => map,
            Err(e) => {
                self.fail("restore", e);
                return false;
            }
        };

        self.map = restored;
        let committed = self.commit(false, self.config().retention_limit);
        if committed {
            tracing::info!(backup = %backup_name, entries = self.map.len(), "database restored");
        }
        committed
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litekv_core::MemoryAuditSink;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn open(dir: &TempDir) -> (Store, MemoryAuditSink) {
        let sink = MemoryAuditSink::new();
        let config = StoreConfig::new(dir.path().join("db.json"))
            .with_backup_dir(dir.path().join("backups"));
        let store = Store::open_with_sink(config, sink.clone()).unwrap();
        (store, sink)
    }

    #[test]
    fn test_set_get_overwrite() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);

        assert!(store.set("a", 1));
        assert_eq!(store.get("a"), Some(&json!(1)));
        assert!(store.set("a", "two"));
        assert_eq!(store.get("a"), Some(&json!("two")));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_keys_are_coerced_to_strings() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);

        store.set(42, true);
        assert_eq!(store.get("42"), Some(&json!(true)));
        assert!(store.contains(42));
        assert!(store.remove(42));
        assert!(!store.contains("42"));
    }

    #[test]
    fn test_remove_keeps_order_of_remaining_keys() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);
        for key in ["a", "b", "c", "d"] {
            store.set(key, 0);
        }

        assert!(store.remove("b"));
        assert!(!store.remove("b"));
        assert_eq!(store.all(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_audit_events() {
        let dir = tempdir().unwrap();
        let (mut store, sink) = open(&dir);

        store.set("a", 1);
        store.remove("a");
        store.remove("a");
        store.set_many([("b", 2), ("c", 3)]);
        store.remove_many(["b", "zzz"]);
        store.purge();

        let actions: Vec<(AuditAction, String)> = sink
            .events()
            .into_iter()
            .map(|e| (e.action, e.key))
            .collect();
        assert_eq!(
            actions,
            vec![
                (AuditAction::Set, "a".to_string()),
                (AuditAction::Remove, "a".to_string()),
                (AuditAction::SetMany, "b".to_string()),
                (AuditAction::SetMany, "c".to_string()),
                (AuditAction::RemoveMany, "b".to_string()),
                (AuditAction::Purge, "*".to_string()),
            ]
        );
        assert_eq!(sink.events()[0].value, Some(json!(1)));
    }

    #[test]
    fn test_bulk_operations() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);

        assert!(store.set_many(vec![("x", json!(1)), ("y", json!([1, 2]))]));
        assert_eq!(store.len(), 2);
        assert_eq!(store.remove_many(["x", "y", "nope"]), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_twice() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);
        store.set("a", 1);

        assert!(store.purge());
        assert!(store.all().is_empty());
        assert!(store.purge());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_search_and_filter() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);
        store.set("user:1", json!({"name": "Alice", "age": 31}));
        store.set("user:2", json!({"name": "Bob", "age": 17}));
        store.set("config", "dark-mode");
        store.set("count", 1234);

        assert_eq!(store.search_by_key("user"), vec!["user:1", "user:2"]);
        assert!(store.search_by_key("USER").is_empty());
        assert_eq!(store.search_by_value("Alice"), vec!["user:1"]);
        assert_eq!(store.search_by_value("dark"), vec!["config"]);
        assert_eq!(store.search_by_value("23"), vec!["count"]);

        let adults = store.filter(|v| v["age"].as_u64().is_some_and(|age| age >= 18));
        assert_eq!(adults.len(), 1);
        assert!(adults.contains_key("user:1"));
    }

    #[test]
    fn test_fuzzy_search() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);
        for key in ["hello", "world", "help"] {
            store.set(key, 0);
        }

        let found = store.fuzzy_search("helo", 80.0);
        assert_eq!(found, vec!["hello", "help"]);
        assert!(store.fuzzy_search("helo", 101.0).is_empty());
    }

    #[test]
    fn test_gated_store_is_inert() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, b"{broken").unwrap();

        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        let seeded = [
            "backup_20240101_000000.json",
            "backup_20240102_000000.json",
            "backup_20240103_000000.json",
        ];
        for name in seeded {
            fs::write(backup_dir.join(name), b"{}").unwrap();
        }

        let sink = MemoryAuditSink::new();
        let config = StoreConfig::new(&path).with_backup_dir(&backup_dir);
        let mut store = Store::open_with_sink(config, sink.clone()).unwrap();

        assert!(!store.is_usable());
        assert!(matches!(store.last_error(), Some(Error::MalformedData(_))));
        assert!(!store.set("a", 1));
        assert_eq!(store.get("a"), None);
        assert!(!store.remove("a"));
        assert!(!store.purge());
        assert!(!store.set_many([("b", 1)]));
        assert_eq!(store.remove_many(["b"]), 0);
        assert!(store.all().is_empty());
        assert!(store.fuzzy_search("a", 0.0).is_empty());
        assert!(!store.save());
        assert!(!store.save_with_backup());
        assert!(sink.events().is_empty());

        // Nothing was written over the unreadable file
        assert_eq!(fs::read(&path).unwrap(), b"{broken");

        // Backups are neither listed nor rotated
        assert!(store.list_backups().is_empty());
        assert_eq!(store.cleanup_backups(0), 0);
        assert!(!store.restore(seeded[0]));
        for name in seeded {
            assert!(backup_dir.join(name).is_file(), "{name} was removed");
        }
    }

    #[test]
    fn test_restore_missing_backup() {
        let dir = tempdir().unwrap();
        let (mut store, _) = open(&dir);
        store.set("a", 1);

        assert!(!store.restore("backup_20000101_000000.json"));
        assert!(matches!(store.last_error(), Some(Error::BackupNotFound(_))));
        assert_eq!(store.get("a"), Some(&json!(1)));
    }
}
