//! # Publisher Module
//!
//! The side-effecting end of the pipeline: renders or uploads one candidate.
//!
//! ## Failure modes
//! - `PublishError::Transient` - this attempt failed, carry on with the next
//!   candidate (the identity stays reserved)
//! - `PublishError::Fatal` - the publisher is unusable, stop the scheduler

mod caption;
mod outbox;

pub use caption::{CaptionBuilder, CaptionConfig};
pub use outbox::OutboxPublisher;
pub use crate::error::PublishError;

use crate::core::candidate::Candidate;

/// Publishes a single candidate
///
/// The scheduler never calls `publish` concurrently, so implementations may
/// hold exclusive resources (a browser session, an API client) without
/// extra locking.
pub trait Publisher: Send {
    fn publish(&mut self, candidate: &Candidate) -> Result<(), PublishError>;
}
