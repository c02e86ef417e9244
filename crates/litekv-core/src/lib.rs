//! # LiteKV Core
//!
//! Core types shared by the LiteKV crates: errors, store configuration,
//! the security mode and the audit event model.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of LiteKV.**
//! Depend on the main `litekv` crate instead.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod config;
pub mod error;

pub use audit::{
    AuditAction, AuditEvent, AuditSink, JsonlAuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use config::StoreConfig;
pub use error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Values stored in LiteKV: any JSON value.
pub use serde_json::Value;

/// The in-memory map. Iteration follows insertion order.
pub type Document = serde_json::Map<String, Value>;

/// Whether stored bytes are plaintext JSON or authenticated-encrypted JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Plain JSON on disk
    #[default]
    Plain,
    /// AES-256-GCM sealed JSON on disk
    Encrypted,
}

impl SecurityMode {
    /// Returns `true` for [`SecurityMode::Encrypted`].
    pub fn is_encrypted(self) -> bool {
        self == SecurityMode::Encrypted
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityMode::Plain => write!(f, "plain"),
            SecurityMode::Encrypted => write!(f, "encrypted"),
        }
    }
}
