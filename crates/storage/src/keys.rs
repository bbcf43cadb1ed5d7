//! Encryption key derivation and verification
//!
//! The host supplies a [`KeyProvider`]: a zero-argument function returning
//! key material. It is called once per store open.
//!
//! Every store records a salted SHA-256 digest of its key in `store_meta`.
//! Reopening with different key material is detected against that digest in
//! every build, including builds where the backend does not encrypt pages.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Zero-argument key derivation function
pub type KeyProvider = Arc<dyn Fn() -> String + Send + Sync>;

const DEFAULT_KEY_LABEL: &str = "smartstore/default-key/v1";

/// Default key derivation: a stable SHA-256 derived key.
///
/// Hosts that need per-device secrecy install their own provider.
pub fn default_key_provider() -> KeyProvider {
    Arc::new(|| {
        let digest = Sha256::digest(DEFAULT_KEY_LABEL.as_bytes());
        STANDARD.encode(digest)
    })
}

/// Provider that disables encryption
pub fn no_encryption() -> KeyProvider {
    Arc::new(String::new)
}

/// Salted digest stored next to the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    /// Base64 salt
    pub salt: String,
    /// Base64 SHA-256 of salt || key
    pub digest: String,
}

impl KeyCheck {
    /// Fresh check for `key` with a random salt
    pub fn generate(key: &str) -> Self {
        let salt: [u8; 16] = rand::random();
        let salt = STANDARD.encode(salt);
        let digest = digest(&salt, key);
        KeyCheck { salt, digest }
    }

    /// Whether `key` produced this check
    pub fn matches(&self, key: &str) -> bool {
        digest(&self.salt, key) == self.digest
    }
}

fn digest(salt: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(key.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Quote key material as a SQL string literal
pub(crate) fn quote_key(key: &str) -> String {
    format!("'{}'", key.replace('\'', "''"))
}
