//! Event type definitions for progress reporting.

use crate::core::scheduler::SchedulerState;
use serde::{Deserialize, Serialize};

/// All events emitted by the publish scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scheduler lifecycle events
    Scheduler(SchedulerEvent),
    /// Batch-level events
    Batch(BatchEvent),
    /// Per-candidate decisions
    Candidate(CandidateEvent),
}

/// Scheduler lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerEvent {
    /// The run loop has started
    Started,
    /// Moved to a new state
    StateChanged { state: SchedulerState },
    /// Waiting out the minimum interval after a publish
    Cooling { seconds: u64 },
    /// The run loop finished
    Stopped { summary: RunSummary },
    /// Cancellation was observed
    Shutdown,
}

/// Batch-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// A batch was pulled from the source
    Fetched { count: usize },
    /// The source failed; the scheduler backs off before retrying
    SourceFailed { message: String, retry_in_secs: u64 },
    /// Every candidate in the batch was handled
    Completed(BatchReport),
}

/// Per-candidate decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateEvent {
    /// Failed a policy predicate
    Rejected {
        external_id: String,
        predicate: String,
        reason: String,
    },
    /// Id or fingerprint was already reserved
    Duplicate { external_id: String, key: String },
    /// Payload could not be fetched
    FetchFailed { external_id: String, message: String },
    /// The dedupe store could not be reached
    StoreFailed { external_id: String, message: String },
    /// Handed to the publisher successfully
    Published {
        external_id: String,
        fingerprint: String,
    },
    /// The publisher reported a transient failure
    PublishFailed { external_id: String, message: String },
}

/// Counts for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Candidates pulled from the source
    pub fetched: usize,
    /// Rejected by the policy chain
    pub policy_rejected: usize,
    /// Rejected as already reserved
    pub duplicates: usize,
    /// Skipped because the payload could not be fetched
    pub fetch_failed: usize,
    /// Skipped because the store was unavailable
    pub store_failed: usize,
    /// Successfully published
    pub published: usize,
    /// Transient publish failures
    pub publish_failed: usize,
    /// The source failed and no candidates were processed
    pub source_failed: bool,
}

/// Totals across a scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub batches: usize,
    pub source_failures: usize,
    pub fetched: usize,
    pub policy_rejected: usize,
    pub duplicates: usize,
    pub fetch_failed: usize,
    pub store_failed: usize,
    pub published: usize,
    pub publish_failed: usize,
    /// Stopped by cancellation rather than by the batch limit
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Fold a batch into the totals
    pub fn absorb(&mut self, report: &BatchReport) {
        self.batches += 1;
        if report.source_failed {
            self.source_failures += 1;
        }
        self.fetched += report.fetched;
        self.policy_rejected += report.policy_rejected;
        self.duplicates += report.duplicates;
        self.fetch_failed += report.fetch_failed;
        self.store_failed += report.store_failed;
        self.published += report.published;
        self.publish_failed += report.publish_failed;
    }
}
