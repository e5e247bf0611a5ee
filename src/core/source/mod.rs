//! # Source Module
//!
//! Where candidates and their payload bytes come from.
//!
//! Both collaborators are traits so the scheduler can be driven by a feed
//! client, a fixture, or an in-memory fake. The bundled implementations
//! work on local files:
//! - `ManifestSource` - candidates listed in a JSON manifest
//! - `FilePayloadFetcher` - payloads read from `file://` urls or paths

mod fetcher;
mod manifest;

pub use fetcher::FilePayloadFetcher;
pub use manifest::ManifestSource;

use crate::core::candidate::Candidate;
use crate::error::{FetchError, SourceError};

/// Supplies raw candidates in batches
pub trait CandidateSource: Send {
    /// Pull up to `limit` candidates
    fn fetch_batch(&mut self, limit: usize) -> Result<Vec<Candidate>, SourceError>;

    /// The candidate reached a final decision (published, duplicate or
    /// rejected by policy) and need not be offered again.
    ///
    /// Candidates skipped for a retryable reason, such as an unreachable
    /// store or payload, are never acknowledged.
    fn acknowledge(&mut self, _external_id: &str) {}
}

/// Downloads the binary payload behind a candidate url
pub trait PayloadFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
