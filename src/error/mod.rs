//! # Error Module
//!
//! Error types for the relay pipeline.
//!
//! ## Design Principles
//! - **Never crash the loop** on a bad candidate - skip it and move on
//! - **Include context** - ids, paths, urls, what went wrong
//! - **Separate expected outcomes** - duplicates are reported as
//!   `StoreError::AlreadyExists` so callers can match on them cheaply

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Dedupe store error: {0}")]
    Store(#[from] StoreError),

    #[error("Candidate source error: {0}")]
    Source(#[from] SourceError),

    #[error("Payload fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which unique column a reservation collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    ExternalId,
    Fingerprint,
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKey::ExternalId => write!(f, "external id"),
            DuplicateKey::Fingerprint => write!(f, "fingerprint"),
        }
    }
}

/// Errors from the dedupe store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open dedupe database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Dedupe storage unavailable: {0}")]
    Unavailable(String),

    #[error("Dedupe store lock poisoned at {path}. Restart the process.")]
    Corrupted { path: PathBuf },

    #[error("Candidate {external_id} already reserved (matching {key})")]
    AlreadyExists {
        external_id: String,
        key: DuplicateKey,
    },
}

impl StoreError {
    /// True for the expected "seen it before" outcome
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Errors from the candidate source (batch level)
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Candidate source unavailable: {0}")]
    Unavailable(String),

    #[error("Manifest {path} is not valid: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },
}

/// Errors while fetching a candidate payload (candidate level)
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unsupported payload url: {url}")]
    UnsupportedUrl { url: String },

    #[error("Failed to read payload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Payload {url} is {size} bytes, limit is {limit}")]
    TooLarge { url: String, size: u64, limit: u64 },
}

/// Errors reported by a publisher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The attempt failed but the next candidate may still succeed
    #[error("Transient publish failure: {0}")]
    Transient(String),

    /// The publisher can no longer work; the scheduler must stop
    #[error("Fatal publish failure: {0}")]
    Fatal(String),
}

/// Errors that stop the publish scheduler
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Publisher failed fatally on {external_id}: {reason}")]
    FatalPublish { external_id: String, reason: String },

    #[error("Scheduler was cancelled")]
    Cancelled,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
