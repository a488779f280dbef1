//! Hashing utilities for content fingerprints.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds a stable fingerprint from ordered parts.
///
/// Parts are joined with `:` before hashing, so `["a", "b"]` and `["a:b"]`
/// collide. Callers pass identifiers that never contain a colon in the
/// leading positions (UUIDs, snake_case kinds).
pub fn fingerprint(parts: &[&str]) -> String {
    sha256_hex(&parts.join(":"))
}
