//! # Scheduler Module
//!
//! Drives candidates from the source to the publisher.
//!
//! ## Per-candidate stages
//! 1. **Filtering** - cheap policy checks, payload fetch, full policy chain
//! 2. **Deduping** - fingerprint the payload and reserve the identity
//! 3. **Publishing** - hand off to the publisher
//! 4. **Cooling** - wait the minimum interval after a successful publish
//!
//! ## Concurrency
//! One worker, one publish at a time. Shutdown is cooperative through a
//! [`CancellationToken`] checked between stages; it also cuts every wait
//! short.

mod cancel;
mod executor;
mod state;

pub use cancel::CancellationToken;
pub use executor::{CommitPolicy, PublishScheduler, PublishSchedulerBuilder, SchedulerConfig};
pub use state::SchedulerState;
