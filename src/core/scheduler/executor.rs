//! Publish scheduler implementation.

use super::{CancellationToken, SchedulerState};
use crate::core::candidate::Candidate;
use crate::core::identity::{fingerprint, Fingerprint};
use crate::core::policy::{PolicyDecision, PolicyFilter};
use crate::core::publisher::{PublishError, Publisher};
use crate::core::source::{CandidateSource, PayloadFetcher};
use crate::core::store::DedupeStore;
use crate::error::{RelayError, SchedulerError, StoreError};
use crate::events::{
    BatchEvent, BatchReport, CandidateEvent, Event, EventSender, RunSummary, SchedulerEvent,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// When an identity is written to the dedupe store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Reserve before publishing. A failed or interrupted publish still
    /// consumes the identity, so content is published at most once.
    #[default]
    ReserveBeforePublish,
    /// Check before publishing and reserve only after success. A failed
    /// publish can be retried later; a crash after publishing can repost.
    CommitAfterPublish,
}

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Candidates requested per batch
    pub batch_size: usize,
    /// Minimum gap after each successful publish
    pub min_publish_interval: Duration,
    /// Wait after the source fails
    pub source_backoff: Duration,
    /// Pause between batches
    pub idle_delay: Duration,
    pub commit_policy: CommitPolicy,
    /// Stop after this many batches (`None` runs until cancelled)
    pub max_batches: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            min_publish_interval: Duration::from_secs(60),
            source_backoff: Duration::from_secs(30),
            idle_delay: Duration::from_secs(5),
            commit_policy: CommitPolicy::default(),
            max_batches: None,
        }
    }
}

/// Builder for the publish scheduler
pub struct PublishSchedulerBuilder {
    config: SchedulerConfig,
    source: Option<Box<dyn CandidateSource>>,
    fetcher: Option<Box<dyn PayloadFetcher>>,
    store: Option<Arc<dyn DedupeStore>>,
    publisher: Option<Box<dyn Publisher>>,
    policy: Option<PolicyFilter>,
    cancel: Option<CancellationToken>,
}

impl PublishSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            source: None,
            fetcher: None,
            store: None,
            publisher: None,
            policy: None,
            cancel: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn min_publish_interval(mut self, interval: Duration) -> Self {
        self.config.min_publish_interval = interval;
        self
    }

    pub fn max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.config.max_batches = max_batches;
        self
    }

    pub fn commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.config.commit_policy = policy;
        self
    }

    pub fn source(mut self, source: Box<dyn CandidateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn fetcher(mut self, fetcher: Box<dyn PayloadFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn store(mut self, store: Arc<dyn DedupeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Defaults to the built-in chain with default thresholds
    pub fn policy(mut self, policy: PolicyFilter) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Share a token so another thread can stop the scheduler
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the scheduler. Every collaborator except the policy is required.
    pub fn build(self) -> Result<PublishScheduler, RelayError> {
        let missing = |what: &str| RelayError::Config(format!("publish scheduler needs a {what}"));

        if self.config.batch_size == 0 {
            return Err(RelayError::Config("batch size must be at least 1".to_string()));
        }

        Ok(PublishScheduler {
            source: self.source.ok_or_else(|| missing("candidate source"))?,
            fetcher: self.fetcher.ok_or_else(|| missing("payload fetcher"))?,
            store: self.store.ok_or_else(|| missing("dedupe store"))?,
            publisher: self.publisher.ok_or_else(|| missing("publisher"))?,
            policy: self.policy.unwrap_or_default(),
            cancel: self.cancel.unwrap_or_default(),
            config: self.config,
            state: SchedulerState::Idle,
            totals: RunSummary::default(),
        })
    }
}

impl Default for PublishSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Published,
    Skipped,
}

/// Drains candidates through policy, dedupe and publisher, one publish at a time
pub struct PublishScheduler {
    config: SchedulerConfig,
    source: Box<dyn CandidateSource>,
    fetcher: Box<dyn PayloadFetcher>,
    store: Arc<dyn DedupeStore>,
    publisher: Box<dyn Publisher>,
    policy: PolicyFilter,
    cancel: CancellationToken,
    state: SchedulerState,
    totals: RunSummary,
}

impl PublishScheduler {
    /// Create a new scheduler builder
    pub fn builder() -> PublishSchedulerBuilder {
        PublishSchedulerBuilder::new()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// A handle that stops this scheduler when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Totals accumulated over every batch so far.
    ///
    /// Still meaningful after `run` returns an error.
    pub fn totals(&self) -> &RunSummary {
        &self.totals
    }

    /// Run batches until cancelled, the batch limit is reached, or the
    /// publisher fails fatally.
    pub fn run(&mut self, events: &EventSender) -> Result<RunSummary, SchedulerError> {
        let start = Instant::now();
        events.send(Event::Scheduler(SchedulerEvent::Started));
        tracing::info!(
            batch_size = self.config.batch_size,
            interval_secs = self.config.min_publish_interval.as_secs(),
            "publish scheduler started"
        );

        let mut batches_run = 0usize;
        loop {
            if self.config.max_batches.is_some_and(|max| batches_run >= max) {
                break;
            }

            match self.run_batch(events) {
                Ok(report) => {
                    batches_run += 1;
                    let reached_limit =
                        self.config.max_batches.is_some_and(|max| batches_run >= max);
                    if !report.source_failed
                        && !reached_limit
                        && self.cancel.wait(self.config.idle_delay)
                    {
                        self.shutdown(events);
                        self.totals.cancelled = true;
                        break;
                    }
                }
                Err(SchedulerError::Cancelled) => {
                    self.totals.cancelled = true;
                    break;
                }
                Err(fatal) => return Err(fatal),
            }
        }

        self.totals.duration_ms = start.elapsed().as_millis() as u64;
        let summary = self.totals.clone();
        events.send(Event::Scheduler(SchedulerEvent::Stopped {
            summary: summary.clone(),
        }));
        tracing::info!(
            published = summary.published,
            duplicates = summary.duplicates,
            rejected = summary.policy_rejected,
            cancelled = summary.cancelled,
            "publish scheduler stopped"
        );
        Ok(summary)
    }

    /// Pull one batch and take every candidate in it to a decision.
    ///
    /// Returns `SchedulerError::Cancelled` if shutdown is observed; counts
    /// for the partial batch are still folded into [`Self::totals`].
    pub fn run_batch(&mut self, events: &EventSender) -> Result<BatchReport, SchedulerError> {
        let mut report = BatchReport::default();
        let result = self.drive_batch(&mut report, events);
        self.totals.absorb(&report);

        if matches!(result, Err(SchedulerError::Cancelled)) {
            self.shutdown(events);
        } else if result.is_ok() {
            events.send(Event::Batch(BatchEvent::Completed(report.clone())));
        }
        result.map(|_| report)
    }

    fn drive_batch(
        &mut self,
        report: &mut BatchReport,
        events: &EventSender,
    ) -> Result<(), SchedulerError> {
        self.check_cancelled()?;
        self.transition(SchedulerState::Fetching, events);

        let candidates = match self.source.fetch_batch(self.config.batch_size) {
            Ok(candidates) => candidates,
            Err(e) => {
                report.source_failed = true;
                self.transition(SchedulerState::Error, events);
                tracing::warn!(error = %e, "candidate source failed, backing off");
                events.send(Event::Batch(BatchEvent::SourceFailed {
                    message: e.to_string(),
                    retry_in_secs: self.config.source_backoff.as_secs(),
                }));
                self.transition(SchedulerState::Idle, events);
                if self.cancel.wait(self.config.source_backoff) {
                    return Err(SchedulerError::Cancelled);
                }
                return Ok(());
            }
        };

        report.fetched = candidates.len();
        tracing::debug!(count = candidates.len(), "fetched candidate batch");
        events.send(Event::Batch(BatchEvent::Fetched {
            count: candidates.len(),
        }));

        for candidate in candidates {
            self.check_cancelled()?;

            if self.process(candidate, report, events)? == Outcome::Published {
                self.transition(SchedulerState::Cooling, events);
                events.send(Event::Scheduler(SchedulerEvent::Cooling {
                    seconds: self.config.min_publish_interval.as_secs(),
                }));
                if self.cancel.wait(self.config.min_publish_interval) {
                    return Err(SchedulerError::Cancelled);
                }
            }
        }

        self.transition(SchedulerState::Idle, events);
        Ok(())
    }

    fn process(
        &mut self,
        mut candidate: Candidate,
        report: &mut BatchReport,
        events: &EventSender,
    ) -> Result<Outcome, SchedulerError> {
        self.transition(SchedulerState::Filtering, events);

        let decision = self.policy.prescreen(&candidate);
        if self.reject_if_needed(&candidate, decision, report, events) {
            return Ok(Outcome::Skipped);
        }

        let payload = match self.fetcher.fetch(&candidate.source_url) {
            Ok(payload) => payload,
            Err(e) => {
                report.fetch_failed += 1;
                tracing::warn!(
                    external_id = %candidate.external_id,
                    error = %e,
                    "payload fetch failed"
                );
                events.send(Event::Candidate(CandidateEvent::FetchFailed {
                    external_id: candidate.external_id.clone(),
                    message: e.to_string(),
                }));
                return Ok(Outcome::Skipped);
            }
        };
        let fp = fingerprint(&payload);
        candidate.attach_payload(payload);

        let decision = self.policy.evaluate(&candidate);
        if self.reject_if_needed(&candidate, decision, report, events) {
            return Ok(Outcome::Skipped);
        }

        self.transition(SchedulerState::Deduping, events);
        if !self.claim(&candidate, &fp, report, events) {
            return Ok(Outcome::Skipped);
        }

        // A reservation made above stands even if we stop here
        self.check_cancelled()?;
        self.transition(SchedulerState::Publishing, events);

        match self.publisher.publish(&candidate) {
            Ok(()) => {
                if self.config.commit_policy == CommitPolicy::CommitAfterPublish {
                    self.record_after_publish(&candidate, &fp);
                }
                report.published += 1;
                self.source.acknowledge(&candidate.external_id);
                tracing::info!(
                    external_id = %candidate.external_id,
                    title = %candidate.title,
                    fingerprint = %fp,
                    "published candidate"
                );
                events.send(Event::Candidate(CandidateEvent::Published {
                    external_id: candidate.external_id.clone(),
                    fingerprint: fp.to_hex(),
                }));
                Ok(Outcome::Published)
            }
            Err(PublishError::Transient(message)) => {
                report.publish_failed += 1;
                // A reserved identity is spent; an unrecorded one may be retried
                if self.config.commit_policy == CommitPolicy::ReserveBeforePublish {
                    self.source.acknowledge(&candidate.external_id);
                }
                self.transition(SchedulerState::Error, events);
                tracing::warn!(
                    external_id = %candidate.external_id,
                    error = %message,
                    "publish failed, skipping candidate"
                );
                events.send(Event::Candidate(CandidateEvent::PublishFailed {
                    external_id: candidate.external_id.clone(),
                    message,
                }));
                self.transition(SchedulerState::Idle, events);
                Ok(Outcome::Skipped)
            }
            Err(PublishError::Fatal(reason)) => {
                self.transition(SchedulerState::Error, events);
                tracing::error!(
                    external_id = %candidate.external_id,
                    error = %reason,
                    "publisher failed fatally"
                );
                self.transition(SchedulerState::Shutdown, events);
                Err(SchedulerError::FatalPublish {
                    external_id: candidate.external_id,
                    reason,
                })
            }
        }
    }

    /// Returns true if the decision rejected the candidate
    fn reject_if_needed(
        &mut self,
        candidate: &Candidate,
        decision: PolicyDecision,
        report: &mut BatchReport,
        events: &EventSender,
    ) -> bool {
        let PolicyDecision::Reject { predicate, reason } = decision else {
            return false;
        };

        report.policy_rejected += 1;
        self.source.acknowledge(&candidate.external_id);
        tracing::debug!(
            external_id = %candidate.external_id,
            predicate = %predicate,
            reason = %reason,
            "candidate rejected by policy"
        );
        events.send(Event::Candidate(CandidateEvent::Rejected {
            external_id: candidate.external_id.clone(),
            predicate,
            reason,
        }));
        true
    }

    /// Claim the identity according to the commit policy.
    ///
    /// Returns false when the candidate must be skipped.
    fn claim(
        &mut self,
        candidate: &Candidate,
        fp: &Fingerprint,
        report: &mut BatchReport,
        events: &EventSender,
    ) -> bool {
        let id = candidate.external_id.as_str();
        let claimed: Result<Option<String>, StoreError> = match self.config.commit_policy {
            CommitPolicy::ReserveBeforePublish => match self.store.reserve(id, fp) {
                Ok(()) => Ok(None),
                Err(StoreError::AlreadyExists { key, .. }) => Ok(Some(key.to_string())),
                Err(e) => Err(e),
            },
            CommitPolicy::CommitAfterPublish => self
                .store
                .is_duplicate(id, fp)
                .map(|seen| seen.then(|| "external id or fingerprint".to_string())),
        };

        match claimed {
            Ok(None) => true,
            Ok(Some(key)) => {
                report.duplicates += 1;
                self.source.acknowledge(id);
                tracing::debug!(external_id = id, key = %key, "duplicate candidate");
                events.send(Event::Candidate(CandidateEvent::Duplicate {
                    external_id: id.to_string(),
                    key,
                }));
                false
            }
            Err(e) => {
                report.store_failed += 1;
                tracing::warn!(external_id = id, error = %e, "dedupe store unavailable, skipping");
                events.send(Event::Candidate(CandidateEvent::StoreFailed {
                    external_id: id.to_string(),
                    message: e.to_string(),
                }));
                false
            }
        }
    }

    fn record_after_publish(&self, candidate: &Candidate, fp: &Fingerprint) {
        match self.store.reserve(&candidate.external_id, fp) {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => tracing::warn!(
                external_id = %candidate.external_id,
                "identity was reserved elsewhere while publishing; content may be posted twice"
            ),
            Err(e) => tracing::error!(
                external_id = %candidate.external_id,
                error = %e,
                "published but could not record identity"
            ),
        }
    }

    fn check_cancelled(&self) -> Result<(), SchedulerError> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        Ok(())
    }

    fn shutdown(&mut self, events: &EventSender) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(SchedulerState::Shutdown, events);
        events.send(Event::Scheduler(SchedulerEvent::Shutdown));
        tracing::info!("publish scheduler shutting down");
    }

    fn transition(&mut self, state: SchedulerState, events: &EventSender) {
        if self.state == state {
            return;
        }
        self.state = state;
        events.send(Event::Scheduler(SchedulerEvent::StateChanged { state }));
    }
}
