//! # LiteKV Codec
//!
//! Turns the in-memory map into the bytes stored on disk and back.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of LiteKV.**
//! Depend on the main `litekv` crate instead.
//!
//! ## Format
//!
//! ```text
//! Plain:     { "key": value, ... }                       (compact JSON)
//! Encrypted: MAGIC (8) | nonce (12) | AES-256-GCM(JSON) + tag (16)
//! ```
//!
//! The magic prefix can never start a JSON document, so the mode of a file
//! is detectable from its first bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use litekv_core::{Document, Error, Result, SecurityMode, StoreConfig};
use rand::RngCore;

pub mod key;

pub use key::{EncryptionKey, KEY_LEN};

/// Format marker at the start of every sealed file
pub const MAGIC: &[u8; 8] = b"LKV\x01ENC\x00";

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Detect the security mode of stored bytes from the format marker.
pub fn detect_mode(bytes: &[u8]) -> SecurityMode {
    if bytes.starts_with(MAGIC) {
        SecurityMode::Encrypted
    } else {
        SecurityMode::Plain
    }
}

/// Map ⇄ bytes transform for one security mode.
#[derive(Debug, Clone)]
pub struct Codec {
    key: Option<EncryptionKey>,
}

impl Codec {
    /// Codec that stores plain JSON
    pub fn plain() -> Self {
        Self { key: None }
    }

    /// Codec that seals JSON with the given key
    pub fn encrypted(key: EncryptionKey) -> Self {
        Self { key: Some(key) }
    }

    /// Build the codec a store config asks for, running key setup in
    /// encrypted mode.
    pub fn for_config(config: &StoreConfig) -> Result<Self> {
        match config.security_mode {
            SecurityMode::Plain => Ok(Self::plain()),
            SecurityMode::Encrypted => Ok(Self::encrypted(EncryptionKey::setup(config)?)),
        }
    }

    /// The mode this codec writes and expects
    pub fn mode(&self) -> SecurityMode {
        if self.key.is_some() {
            SecurityMode::Encrypted
        } else {
            SecurityMode::Plain
        }
    }

    /// Serialize the map, sealing it when encrypted.
    ///
    /// The JSON is deterministic for a given map. Sealed output differs
    /// between calls because every call draws a fresh nonce.
    pub fn encode(&self, map: &Document) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(map).map_err(|e| Error::Serialization(e.to_string()))?;
        match &self.key {
            None => Ok(json),
            Some(key) => seal(key, &json),
        }
    }

    /// Inverse of [`Codec::encode`].
    pub fn decode(&self, bytes: &[u8]) -> Result<Document> {
        match &self.key {
            None => parse(bytes),
            Some(key) => {
                let json = open(key, bytes)?;
                parse(&json)
            }
        }
    }
}

fn parse(json: &[u8]) -> Result<Document> {
    serde_json::from_slice(json).map_err(|e| Error::MalformedData(e.to_string()))
}

fn cipher(key: &EncryptionKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Configuration(format!("invalid encryption key: {e}")))
}

fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher(key)?
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| Error::Serialization(format!("encryption failed: {e}")))?;

    let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(key: &EncryptionKey, sealed: &[u8]) -> Result<Vec<u8>> {
    let body = sealed
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| Error::Decryption("missing format marker".into()))?;
    if body.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::Decryption(format!(
            "sealed payload too short: {} bytes",
            sealed.len()
        )));
    }

    let (nonce, ciphertext) = body.split_at(NONCE_LEN);
    cipher(key)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Decryption("authentication failed (tampered data or wrong key)".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let mut map = Document::new();
        map.insert("name".into(), json!("litekv"));
        map.insert("count".into(), json!(3));
        map.insert("tags".into(), json!(["a", "b"]));
        map.insert("nested".into(), json!({"on": true, "none": null}));
        map
    }

    #[test]
    fn test_plain_encode_is_json() {
        let bytes = Codec::plain().encode(&sample()).unwrap();
        assert_eq!(bytes[0], b'{');
        assert_eq!(detect_mode(&bytes), SecurityMode::Plain);
        assert_eq!(Codec::plain().decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_plain_encode_keeps_key_order() {
        let bytes = Codec::plain().encode(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let name = text.find("\"name\"").unwrap();
        let count = text.find("\"count\"").unwrap();
        let tags = text.find("\"tags\"").unwrap();
        assert!(name < count && count < tags);
    }

    #[test]
    fn test_encrypted_roundtrip_and_marker() {
        let codec = Codec::encrypted(EncryptionKey::generate());
        let bytes = codec.encode(&sample()).unwrap();
        assert!(bytes.starts_with(MAGIC));
        assert_eq!(detect_mode(&bytes), SecurityMode::Encrypted);
        assert_eq!(codec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let codec = Codec::encrypted(EncryptionKey::generate());
        let mut bytes = codec.encode(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(codec.decode(&bytes), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let bytes = Codec::encrypted(EncryptionKey::generate())
            .encode(&sample())
            .unwrap();
        let other = Codec::encrypted(EncryptionKey::generate());
        assert!(matches!(other.decode(&bytes), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let codec = Codec::encrypted(EncryptionKey::generate());
        let bytes = codec.encode(&sample()).unwrap();
        let truncated = &bytes[..MAGIC.len() + 4];
        assert!(matches!(codec.decode(truncated), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_encrypted_codec_rejects_plain_bytes() {
        let codec = Codec::encrypted(EncryptionKey::generate());
        assert!(matches!(codec.decode(b"{}"), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Codec::plain().decode(b"{not json"),
            Err(Error::MalformedData(_))
        ));
        // Top level must be an object
        assert!(matches!(
            Codec::plain().decode(b"[1, 2, 3]"),
            Err(Error::MalformedData(_))
        ));
    }

    #[test]
    fn test_empty_map() {
        let bytes = Codec::plain().encode(&Document::new()).unwrap();
        assert_eq!(bytes, b"{}");
    }
}
