//! API key generation and hashing for customer-issued keys

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Length of the display prefix kept alongside the hash
pub const KEY_PREFIX_LEN: usize = 8;

/// API key generator
pub struct ApiKeyGenerator;

impl ApiKeyGenerator {
    /// Generate a new API key
    /// Format: 64 hex chars (256 random bits)
    pub fn generate() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Display prefix (first 8 chars)
    pub fn prefix(key: &str) -> String {
        key.chars().take(KEY_PREFIX_LEN).collect()
    }

    /// Hash API key for storage using SHA-256
    pub fn hash(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }
}
