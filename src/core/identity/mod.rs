//! # Identity Module
//!
//! Content-addressed fingerprints for candidate payloads.
//!
//! Two payloads with identical bytes always share a fingerprint, whatever
//! external id they arrived under. This is the main repost signal.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in bytes (SHA-256)
pub const FINGERPRINT_LEN: usize = 32;

/// A fixed-length SHA-256 digest of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Restore a fingerprint from stored bytes
    ///
    /// Returns `None` unless `bytes` is exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; FINGERPRINT_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Get the raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the digest as a lowercase hexadecimal string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the fingerprint of a payload.
///
/// The empty payload is valid and yields the digest of the empty sequence.
pub fn fingerprint(payload: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(payload);
    let mut bytes = [0u8; FINGERPRINT_LEN];
    bytes.copy_from_slice(&digest);
    Fingerprint(bytes)
}
