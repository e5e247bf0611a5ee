//! Dedupe store trait definition.

use super::StoreStats;
use crate::core::identity::Fingerprint;
use crate::error::StoreError;

/// Trait for dedupe store backends
///
/// Implementations must be safe to share between workers: `reserve` is the
/// only write and must never let two callers claim the same identity.
pub trait DedupeStore: Send + Sync {
    /// Create the schema if it is missing. Safe to call on every startup.
    fn initialize(&self) -> Result<(), StoreError>;

    /// Check whether the external id OR the fingerprint was already reserved
    fn is_duplicate(&self, external_id: &str, fingerprint: &Fingerprint)
        -> Result<bool, StoreError>;

    /// Atomically claim an identity.
    ///
    /// Fails with `StoreError::AlreadyExists` when either half of the pair
    /// is already present, including when a concurrent caller won the race.
    fn reserve(&self, external_id: &str, fingerprint: &Fingerprint) -> Result<(), StoreError>;

    /// Get store statistics
    fn stats(&self) -> Result<StoreStats, StoreError>;
}
