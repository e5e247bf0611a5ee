//! In-memory dedupe store for testing.

use super::{DedupeStore, StoreStats};
use crate::core::identity::Fingerprint;
use crate::error::{DuplicateKey, StoreError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Default)]
struct Records {
    by_id: HashMap<String, SystemTime>,
    by_fingerprint: HashMap<Fingerprint, String>,
}

/// In-memory dedupe store
///
/// Same semantics as the SQLite store without persistence. A single mutex
/// guards both indexes so check-and-insert is atomic.
pub struct InMemoryDedupeStore {
    records: Mutex<Records>,
}

impl InMemoryDedupeStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn conflict(
        records: &Records,
        external_id: &str,
        fingerprint: &Fingerprint,
    ) -> Option<DuplicateKey> {
        if records.by_id.contains_key(external_id) {
            Some(DuplicateKey::ExternalId)
        } else if records.by_fingerprint.contains_key(fingerprint) {
            Some(DuplicateKey::Fingerprint)
        } else {
            None
        }
    }
}

impl Default for InMemoryDedupeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupeStore for InMemoryDedupeStore {
    fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn is_duplicate(
        &self,
        external_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        let records = self.lock()?;
        Ok(Self::conflict(&records, external_id, fingerprint).is_some())
    }

    fn reserve(&self, external_id: &str, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        let mut records = self.lock()?;

        if let Some(key) = Self::conflict(&records, external_id, fingerprint) {
            return Err(StoreError::AlreadyExists {
                external_id: external_id.to_string(),
                key,
            });
        }

        records
            .by_id
            .insert(external_id.to_string(), SystemTime::now());
        records
            .by_fingerprint
            .insert(*fingerprint, external_id.to_string());
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let records = self.lock()?;

        Ok(StoreStats {
            total_records: records.by_id.len(),
            oldest_reservation: records.by_id.values().min().copied(),
            newest_reservation: records.by_id.values().max().copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::fingerprint;

    #[test]
    fn empty_store_has_no_duplicates() {
        let store = InMemoryDedupeStore::new();
        assert!(!store.is_duplicate("t3_a", &fingerprint(b"a")).unwrap());
    }

    #[test]
    fn reserve_then_duplicate_by_either_key() {
        let store = InMemoryDedupeStore::new();
        let fp = fingerprint(b"a");

        store.reserve("t3_a", &fp).unwrap();

        assert!(store.reserve("t3_a", &fingerprint(b"b")).unwrap_err().is_already_exists());
        assert!(store.reserve("t3_b", &fp).unwrap_err().is_already_exists());
        assert_eq!(store.stats().unwrap().total_records, 1);
    }

    #[test]
    fn failed_reserve_leaves_no_partial_record() {
        let store = InMemoryDedupeStore::new();
        store.reserve("t3_a", &fingerprint(b"a")).unwrap();

        // id collides, so the new fingerprint must not be recorded either
        let fresh = fingerprint(b"fresh");
        let _ = store.reserve("t3_a", &fresh);

        assert!(!store.is_duplicate("t3_new", &fresh).unwrap());
    }
}
