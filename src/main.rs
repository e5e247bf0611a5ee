//! # repost-guard CLI
//!
//! Command-line interface for the relay.
//!
//! ## Usage
//! ```bash
//! repost-guard run --manifest feed.json --outbox ./outbox --batches 3
//! repost-guard check --manifest feed.json
//! repost-guard stats
//! ```

mod cli;

use repost_guard::Result;

fn main() -> Result<()> {
    repost_guard::init_tracing();
    cli::run()
}
