//! Audit events for store mutations.
//!
//! Every mutating store operation emits one [`AuditEvent`] per affected key
//! to an injected [`AuditSink`]. The store only produces events; where they
//! end up is the sink's business.

use crate::{Result, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key recorded for events that affect the whole map
pub const ALL_KEYS: &str = "*";

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Single key inserted or overwritten
    Set,
    /// Single key deleted
    Remove,
    /// Whole map cleared
    Purge,
    /// Key written as part of a bulk set
    SetMany,
    /// Key deleted as part of a bulk remove
    RemoveMany,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditAction::Set => "SET",
            AuditAction::Remove => "REMOVE",
            AuditAction::Purge => "PURGE",
            AuditAction::SetMany => "SET_MANY",
            AuditAction::RemoveMany => "REMOVE_MANY",
        };
        f.write_str(name)
    }
}

/// A single audited mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened
    pub action: AuditAction,
    /// Affected key ([`ALL_KEYS`] for a purge)
    pub key: String,
    /// New value for set actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// When the mutation was applied
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with the current time.
    pub fn new(action: AuditAction, key: impl Into<String>) -> Self {
        Self {
            action,
            key: key.into(),
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the written value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Receiver of audit events.
///
/// Called synchronously, in mutation order. Implementations must not panic
/// and must swallow their own I/O failures.
pub trait AuditSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event)
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Box<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event)
    }
}

/// Default sink: one `tracing` event per mutation on target `litekv::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            target: "litekv::audit",
            action = %event.action,
            key = %event.key,
            timestamp = %event.timestamp.to_rfc3339(),
            "mutation"
        );
    }
}

/// Sink that keeps events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Sink that appends events to a file in JSONL format (one JSON object per line).
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    /// Open (or create) the log file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every event in the log file.
    pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>> {
        let content = fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| crate::Error::MalformedData(format!("audit log line: {e}")))
            })
            .collect()
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        let mut line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize audit event");
                return;
            }
        };
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = file.write_all(&line).and_then(|_| file.flush()) {
            tracing::error!(path = ?self.path, error = %e, "failed to append audit event");
        }
    }
}
