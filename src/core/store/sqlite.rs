//! SQLite dedupe store for persistent storage.

use super::{DedupeStore, StoreStats};
use crate::core::identity::Fingerprint;
use crate::error::{DuplicateKey, StoreError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite-backed persistent dedupe store
///
/// Uses WAL (Write-Ahead Logging) mode so readers are not blocked by the
/// writer. Reservations run inside an IMMEDIATE transaction, which takes the
/// database write lock up front; other processes sharing the file wait up to
/// the busy timeout instead of interleaving their check and insert.
pub struct SqliteDedupeStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteDedupeStore {
    /// Open or create a dedupe database at the given path
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };
        store.initialize()?;

        tracing::debug!(path = %path.display(), "opened dedupe store");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    /// Convert SystemTime to Unix timestamp
    fn to_timestamp(time: SystemTime) -> i64 {
        time.duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64
    }

    /// Convert Unix timestamp to SystemTime
    fn from_timestamp(timestamp: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
    }

    /// Find which column, if any, already holds part of this identity
    fn find_conflict(
        conn: &Connection,
        external_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DuplicateKey>, StoreError> {
        let existing: Option<String> = conn
            .query_row(
                "SELECT external_id FROM records
                 WHERE external_id = ?1 OR fingerprint = ?2
                 ORDER BY external_id = ?1 DESC
                 LIMIT 1",
                params![external_id, fingerprint.as_bytes()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(existing.map(|id| {
            if id == external_id {
                DuplicateKey::ExternalId
            } else {
                DuplicateKey::Fingerprint
            }
        }))
    }
}

impl DedupeStore for SqliteDedupeStore {
    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                external_id TEXT PRIMARY KEY,
                fingerprint BLOB NOT NULL UNIQUE,
                reserved_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn is_duplicate(
        &self,
        external_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        Ok(Self::find_conflict(&conn, external_id, fingerprint)?.is_some())
    }

    fn reserve(&self, external_id: &str, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Dropping the transaction on any early return rolls it back
        if let Some(key) = Self::find_conflict(&tx, external_id, fingerprint)? {
            return Err(StoreError::AlreadyExists {
                external_id: external_id.to_string(),
                key,
            });
        }

        // The write lock is held, so no other writer can slip in between
        tx.execute(
            "INSERT INTO records (external_id, fingerprint, reserved_at) VALUES (?1, ?2, ?3)",
            params![
                external_id,
                fingerprint.as_bytes(),
                Self::to_timestamp(SystemTime::now()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;

        let (total, oldest, newest): (i64, Option<i64>, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MIN(reserved_at), MAX(reserved_at) FROM records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            total_records: total as usize,
            oldest_reservation: oldest.map(Self::from_timestamp),
            newest_reservation: newest.map(Self::from_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::fingerprint;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> SqliteDedupeStore {
        SqliteDedupeStore::open(&dir.path().join("dupes.db"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn sqlite_store_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("dupes.db");

        let store = SqliteDedupeStore::open(&db_path, Duration::from_secs(1)).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.stats().unwrap().total_records, 0);
    }

    #[test]
    fn initialize_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.reserve("t3_a", &fingerprint(b"a")).unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();

        assert_eq!(store.stats().unwrap().total_records, 1);
    }

    #[test]
    fn second_reserve_of_same_identity_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let fp = fingerprint(b"meme");

        store.reserve("t3_a", &fp).unwrap();
        let err = store.reserve("t3_a", &fp).unwrap_err();

        assert!(err.is_already_exists());
    }

    #[test]
    fn same_fingerprint_under_new_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let fp = fingerprint(b"meme");

        store.reserve("t3_a", &fp).unwrap();
        let err = store.reserve("t3_b", &fp).unwrap_err();

        match err {
            StoreError::AlreadyExists { key, .. } => assert_eq!(key, DuplicateKey::Fingerprint),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.stats().unwrap().total_records, 1);
    }

    #[test]
    fn same_id_with_new_fingerprint_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        store.reserve("t3_a", &fingerprint(b"one")).unwrap();
        let err = store.reserve("t3_a", &fingerprint(b"two")).unwrap_err();

        match err {
            StoreError::AlreadyExists { key, .. } => assert_eq!(key, DuplicateKey::ExternalId),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn is_duplicate_matches_either_column() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let fp = fingerprint(b"meme");
        store.reserve("t3_a", &fp).unwrap();

        assert!(store.is_duplicate("t3_a", &fingerprint(b"other")).unwrap());
        assert!(store.is_duplicate("t3_z", &fp).unwrap());
        assert!(!store.is_duplicate("t3_z", &fingerprint(b"other")).unwrap());
    }

    #[test]
    fn records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let fp = fingerprint(b"persisted");

        {
            let store = open(&temp_dir);
            store.reserve("t3_a", &fp).unwrap();
        }

        let store = open(&temp_dir);
        assert!(store.is_duplicate("t3_a", &fp).unwrap());
        assert!(store.stats().unwrap().newest_reservation.is_some());
    }

    #[test]
    fn concurrent_reservations_admit_exactly_one() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open(&temp_dir));
        let fp = fingerprint(b"contested");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.reserve(&format!("t3_{i}"), &fp).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn separate_handles_share_reservations() {
        let temp_dir = TempDir::new().unwrap();
        let first = open(&temp_dir);
        let second = open(&temp_dir);
        let fp = fingerprint(b"shared");

        first.reserve("t3_a", &fp).unwrap();

        assert!(second.is_duplicate("t3_b", &fp).unwrap());
        assert!(second.reserve("t3_b", &fp).unwrap_err().is_already_exists());
    }
}
