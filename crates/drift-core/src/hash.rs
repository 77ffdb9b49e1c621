use crate::canon::canonical_json_bytes;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Sha of a fingerprint payload: SHA-256 over its canonical JSON.
pub fn data_sha(data: &Value) -> String {
    sha256_hex(&canonical_json_bytes(data))
}
