//! Error types for LiteKV.

use crate::SecurityMode;
use thiserror::Error;

/// The main error type for LiteKV operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding the map
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes are not a valid JSON object
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// Authenticated decryption failed (tampered data, truncated data or wrong key)
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The data file was written under a different security mode
    #[error("Security mode mismatch: {}", mismatch_message(.detected, .configured))]
    SecurityModeMismatch {
        /// Mode detected from the file contents
        detected: SecurityMode,
        /// Mode the store was configured with
        configured: SecurityMode,
    },

    /// Written bytes did not read back intact
    #[error("Corruption: {0}")]
    Corruption(String),

    /// Unrecoverable setup problem (e.g. missing key file for existing data)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested backup does not exist
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn mismatch_message(detected: &SecurityMode, configured: &SecurityMode) -> &'static str {
    match (detected, configured) {
        (SecurityMode::Encrypted, SecurityMode::Plain) => {
            "data is encrypted but encryption disabled"
        }
        (SecurityMode::Plain, SecurityMode::Encrypted) => {
            "data is plaintext but encryption enabled"
        }
        _ => "modes agree",
    }
}

impl Error {
    /// Returns `true` for errors that must abort store construction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::SecurityModeMismatch { .. }
        )
    }
}

/// A specialized `Result` type for LiteKV operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_messages() {
        let err = Error::SecurityModeMismatch {
            detected: SecurityMode::Encrypted,
            configured: SecurityMode::Plain,
        };
        assert!(err
            .to_string()
            .contains("data is encrypted but encryption disabled"));

        let err = Error::SecurityModeMismatch {
            detected: SecurityMode::Plain,
            configured: SecurityMode::Encrypted,
        };
        assert!(err
            .to_string()
            .contains("data is plaintext but encryption enabled"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Configuration("missing key".into()).is_fatal());
        assert!(!Error::Decryption("bad tag".into()).is_fatal());
        assert!(!Error::BackupNotFound("x".into()).is_fatal());
    }
}
