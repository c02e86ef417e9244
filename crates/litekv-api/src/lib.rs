//! # LiteKV
//!
//! A small file-backed key-value store for JSON values, with optional
//! encryption at rest, rotating backups and point-in-time restore.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use litekv::{Store, StoreConfig};
//! use serde_json::json;
//!
//! fn main() -> Result<(), litekv::Error> {
//!     let mut store = Store::open(StoreConfig::new("./data.json"))?;
//!
//!     store.set("user:1", json!({"name": "Alice"}));
//!     store.set("visits", 3);
//!
//!     // Nothing reaches disk until you save
//!     store.save_with_backup();
//!
//!     if let Some(user) = store.get("user:1") {
//!         println!("{user}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Encryption
//!
//! ```rust,no_run
//! use litekv::{Store, StoreConfig};
//!
//! // First open generates ./secrets.json.key; keep it next to the data file.
//! let store = Store::open(StoreConfig::new("./secrets.json").encrypted())?;
//! # Ok::<(), litekv::Error>(())
//! ```
//!
//! Opening an encrypted file without encryption (or the reverse) is refused,
//! as is opening existing encrypted data whose key file is gone.
//!
//! ## Failure model
//!
//! - Setup problems abort [`Store::open`] with an error.
//! - A data file that cannot be decoded yields a *gated* store: every
//!   operation is a no-op returning `false`/`None`/empty, and
//!   [`Store::last_error`] explains why.
//! - Saves are atomic: the data file holds either the old or the new state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod facade;
pub mod fuzzy;
pub mod logging;
pub mod security;
mod store;

// Re-export core types
pub use litekv_core::{
    AuditAction, AuditEvent, AuditSink, Document, Error, JsonlAuditSink, MemoryAuditSink,
    Result, SecurityMode, StoreConfig, TracingAuditSink, Value,
};

// Codec components
pub use litekv_codec::{detect_mode, Codec, EncryptionKey};

// Backup components
pub use litekv_backup::{BackupConfig, BackupInfo, BackupManager, BackupName};

// Storage components
pub use litekv_storage::{LoadOutcome, SaveReport, StorageEngine};

pub use fuzzy::FuzzyMatch;
pub use store::{SharedStore, Store};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
