//! # Core Module
//!
//! The dedupe and publish engine. Nothing in here talks to a terminal.
//!
//! ## Modules
//! - `candidate` - The content item flowing through the pipeline
//! - `identity` - SHA-256 payload fingerprints
//! - `store` - Persistent record of reserved identities
//! - `policy` - Ordered business-rule predicates
//! - `media` - Image dimensions read from payload headers
//! - `source` - Candidate and payload providers
//! - `publisher` - The publishing side, captions included
//! - `scheduler` - The rate-limited state machine tying it together
//! - `config` - Settings file

pub mod candidate;
pub mod config;
pub mod identity;
pub mod media;
pub mod policy;
pub mod publisher;
pub mod scheduler;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use candidate::{Candidate, Signals};
pub use config::RelayConfig;
pub use identity::{fingerprint, Fingerprint};
pub use policy::{PolicyDecision, PolicyFilter};
pub use scheduler::{CancellationToken, PublishScheduler, SchedulerState};
pub use store::{DedupeStore, SqliteDedupeStore};
