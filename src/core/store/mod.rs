//! # Store Module
//!
//! Remembers every identity that was ever reserved for publishing.
//!
//! ## Guarantees
//! - A record is a pair `(external_id, fingerprint)`; each column is unique
//!   on its own, so a candidate is a duplicate if either value was seen
//! - `reserve` is an atomic check-and-insert
//! - Records are never updated or deleted; the store only grows
//!
//! ## Backends
//! - `SqliteDedupeStore` - Persistent storage using SQLite
//! - `InMemoryDedupeStore` - For testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryDedupeStore;
pub use sqlite::SqliteDedupeStore;
pub use traits::DedupeStore;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of reserved identities
    pub total_records: usize,
    /// Oldest reservation timestamp
    pub oldest_reservation: Option<SystemTime>,
    /// Newest reservation timestamp
    pub newest_reservation: Option<SystemTime>,
}
