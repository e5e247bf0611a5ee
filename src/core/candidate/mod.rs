//! # Candidate Module
//!
//! A single content item under evaluation, from the moment it is pulled
//! from a source until the pipeline makes a decision about it.

use crate::core::media::Dimensions;
use serde::{Deserialize, Serialize};

/// Metadata signals used by the policy filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    /// Community score (upvotes or similar)
    pub score: i64,
    /// Marked as restricted / over-18 by the source
    pub restricted: bool,
    /// Pinned or stickied by the source
    pub pinned: bool,
}

/// A content item considered for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Stable id from the source system
    pub external_id: String,
    /// Human-readable label, used for captioning
    #[serde(default)]
    pub title: String,
    /// Where the payload is fetched from
    #[serde(default)]
    pub source_url: String,
    /// Policy signals
    #[serde(flatten)]
    pub signals: Signals,
    /// Payload bytes, fetched lazily
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
    /// Pixel dimensions decoded from the payload
    #[serde(skip)]
    pub dimensions: Option<Dimensions>,
}

impl Candidate {
    /// Create a candidate with no payload attached yet
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
        signals: Signals,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            source_url: source_url.into(),
            signals,
            payload: None,
            dimensions: None,
        }
    }

    /// Attach fetched payload bytes and decode their dimensions
    pub fn attach_payload(&mut self, payload: Vec<u8>) {
        self.dimensions = crate::core::media::read_dimensions(&payload);
        self.payload = Some(payload);
    }

    /// Whether the payload has been fetched
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Lowercased extension of the source url, ignoring query and fragment
    pub fn url_extension(&self) -> Option<String> {
        let path = self
            .source_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let file_name = path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(format!(".{}", ext.to_lowercase()))
    }
}
