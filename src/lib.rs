//! # Repost Guard
//!
//! Relays media candidates from a feed to a publisher without ever
//! publishing the same content twice.
//!
//! ## Core Philosophy
//! - **At most once** - an identity is reserved before it is published
//! - **Content, not ids** - reposts under a new id are caught by fingerprint
//! - **Keep going** - a bad candidate is skipped, never fatal
//!
//! ## Architecture
//! - `core` - Identity, dedupe store, policy chain and publish scheduler
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{RelayError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Filtering follows
/// `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
