//! Encryption key material and the key file next to the data file.

use litekv_core::{Error, Result, StoreConfig};
use rand::RngCore;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// Key length for AES-256-GCM
pub const KEY_LEN: usize = 32;

/// Symmetric key used to seal the data file. Zeroized on drop.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

impl EncryptionKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self { bytes }
    }

    /// Build a key from raw bytes; must be exactly [`KEY_LEN`] long.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != KEY_LEN {
            return Err(Error::Configuration(format!(
                "key must be {} bytes, got {}",
                KEY_LEN,
                raw.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Load a key file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = Zeroizing::new(fs::read(path)?);
        Self::from_bytes(&raw).map_err(|e| {
            Error::Configuration(format!("invalid key file {}: {}", path.display(), e))
        })
    }

    /// Persist the key. Refuses to overwrite an existing key file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path)?;
        fill_or_remove(path, file, |f| {
            f.write_all(self.as_bytes())?;
            f.sync_all()
        })
    }

    /// Resolve the key for an encrypted store.
    ///
    /// Loads `<storage_path>.key` when present. Otherwise a key is generated
    /// only if no data file exists yet; a data file without its key is a
    /// fatal configuration error since a new key could never open it.
    pub fn setup(config: &StoreConfig) -> Result<Self> {
        let key_path = config.key_path();
        if key_path.exists() {
            tracing::debug!(path = ?key_path, "loading encryption key");
            return Self::load(&key_path);
        }

        if config.storage_path.exists() {
            return Err(Error::Configuration(format!(
                "key file {} is missing but data file {} exists",
                key_path.display(),
                config.storage_path.display()
            )));
        }

        let key = Self::generate();
        key.save(&key_path)?;
        tracing::info!(path = ?key_path, "generated new encryption key");
        Ok(key)
    }
}

/// Run `write` on a freshly created file; on failure delete the partial
/// file so it is never mistaken for a valid key.
fn fill_or_remove(
    path: &Path,
    mut file: File,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<()> {
    if let Err(e) = write(&mut file) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}
