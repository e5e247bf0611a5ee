//! # CLI Module
//!
//! Command-line interface for the relay.
//!
//! ## Usage
//! ```bash
//! # Relay a manifest into an outbox folder, three batches then stop
//! repost-guard run --manifest feed.json --outbox ./outbox --batches 3
//!
//! # Dry run: show what the policy chain thinks of each candidate
//! repost-guard check --manifest feed.json
//!
//! # Show how many identities the dedupe store holds
//! repost-guard stats --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use repost_guard::core::config::RelayConfig;
use repost_guard::core::policy::{PolicyDecision, PolicyFilter};
use repost_guard::core::publisher::{CaptionBuilder, OutboxPublisher};
use repost_guard::core::scheduler::PublishScheduler;
use repost_guard::core::source::{FilePayloadFetcher, ManifestSource, PayloadFetcher};
use repost_guard::core::store::{DedupeStore, SqliteDedupeStore, StoreStats};
use repost_guard::error::{RelayError, Result};
use repost_guard::events::{event_channel, CandidateEvent, Event, RunSummary, SchedulerEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

/// Repost Guard - publish everything once, nothing twice
#[derive(Parser, Debug)]
#[command(name = "repost-guard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Relay candidates from a manifest into an outbox folder
    Run {
        /// JSON manifest of candidates
        #[arg(short, long)]
        manifest: PathBuf,

        /// Folder that receives published payloads and captions
        #[arg(long)]
        outbox: PathBuf,

        /// Base folder for relative payload urls (defaults to the manifest's folder)
        #[arg(long)]
        media_root: Option<PathBuf>,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dedupe database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Stop after this many batches
        #[arg(short, long)]
        batches: Option<usize>,

        /// Minimum seconds between publishes
        #[arg(short, long)]
        interval: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Evaluate every manifest entry against the policy chain without publishing
    Check {
        /// JSON manifest of candidates
        #[arg(short, long)]
        manifest: PathBuf,

        /// Base folder for relative payload urls (defaults to the manifest's folder)
        #[arg(long)]
        media_root: Option<PathBuf>,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Show dedupe store statistics
    Stats {
        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dedupe database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            manifest,
            outbox,
            media_root,
            config,
            db,
            batches,
            interval,
            output,
        } => {
            let mut settings = load_config(config.as_deref())?;
            if let Some(db) = db {
                settings.store_path = db;
            }
            if let Some(interval) = interval {
                settings.min_publish_interval_secs = interval;
            }
            let media_root = media_root.unwrap_or_else(|| manifest_dir(&manifest));
            run_relay(&settings, manifest, outbox, media_root, batches, output)
        }
        Commands::Check {
            manifest,
            media_root,
            config,
            output,
        } => {
            let settings = load_config(config.as_deref())?;
            let media_root = media_root.unwrap_or_else(|| manifest_dir(&manifest));
            run_check(&settings, &manifest, media_root, output)
        }
        Commands::Stats { config, db, output } => {
            let mut settings = load_config(config.as_deref())?;
            if let Some(db) = db {
                settings.store_path = db;
            }
            run_stats(&settings, output)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RelayConfig> {
    match path {
        Some(path) => RelayConfig::load(path),
        None => Ok(RelayConfig::default()),
    }
}

fn manifest_dir(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn open_store(settings: &RelayConfig) -> Result<SqliteDedupeStore> {
    Ok(SqliteDedupeStore::open(
        &settings.store_path,
        settings.busy_timeout(),
    )?)
}

fn run_relay(
    settings: &RelayConfig,
    manifest: PathBuf,
    outbox: PathBuf,
    media_root: PathBuf,
    batches: Option<usize>,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Repost Guard").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  store: {}",
            style(settings.store_path.display()).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let store = open_store(settings)?;
    let publisher = OutboxPublisher::new(outbox, CaptionBuilder::new(settings.caption.clone()))?;

    let mut scheduler = PublishScheduler::builder()
        .config(settings.scheduler())
        .max_batches(batches)
        .source(Box::new(ManifestSource::new(manifest)))
        .fetcher(Box::new(FilePayloadFetcher::new(media_root)))
        .store(Arc::new(store))
        .publisher(Box::new(publisher))
        .policy(PolicyFilter::new(&settings.policy()))
        .build()?;

    let (sender, receiver) = event_channel();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = progress_clone.as_ref() else {
                continue;
            };
            match event {
                Event::Scheduler(SchedulerEvent::StateChanged { state }) => {
                    pb.set_message(format!("{}", state));
                }
                Event::Scheduler(SchedulerEvent::Cooling { seconds }) => {
                    pb.set_message(format!("Cooling for {}s", seconds));
                }
                Event::Candidate(CandidateEvent::Published { external_id, .. }) => {
                    pb.println(format!("  {} {}", style("✓").green(), external_id));
                }
                Event::Candidate(CandidateEvent::PublishFailed { external_id, message }) => {
                    pb.println(format!("  {} {} ({})", style("✗").red(), external_id, message));
                }
                Event::Scheduler(SchedulerEvent::Stopped { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = scheduler.run(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            // Show what made it out before the publisher gave up
            if matches!(output, OutputFormat::Pretty) {
                print_pretty_summary(&term, scheduler.totals(), &style("✗ Relay stopped").red());
            }
            return Err(e.into());
        }
    };
    match output {
        OutputFormat::Pretty => {
            let headline = if summary.cancelled {
                "✓ Relay cancelled"
            } else {
                "✓ Relay finished"
            };
            print_pretty_summary(&term, &summary, &style(headline).green().bold());
        }
        OutputFormat::Json => print_json(&serde_json::to_value(&summary).unwrap_or_default()),
    }

    Ok(())
}

fn print_pretty_summary(term: &Term, summary: &RunSummary, headline: &dyn std::fmt::Display) {
    term.write_line("").ok();
    term.write_line(&headline.to_string()).ok();
    term.write_line("").ok();

    let rows = [
        ("batches", summary.batches),
        ("candidates fetched", summary.fetched),
        ("published", summary.published),
        ("duplicates skipped", summary.duplicates),
        ("rejected by policy", summary.policy_rejected),
        ("payload fetch failures", summary.fetch_failed),
        ("store failures", summary.store_failed),
        ("publish failures", summary.publish_failed),
        ("source failures", summary.source_failures),
    ];
    for (label, count) in rows {
        if count > 0 || label == "published" {
            term.write_line(&format!("  {} {}", style(count).cyan(), label)).ok();
        }
    }

    term.write_line(&format!(
        "  finished in {:.1}s",
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
}

fn run_check(
    settings: &RelayConfig,
    manifest: &Path,
    media_root: PathBuf,
    output: OutputFormat,
) -> Result<()> {
    let source = ManifestSource::new(manifest);
    let fetcher = FilePayloadFetcher::new(media_root);
    let policy = PolicyFilter::new(&settings.policy());

    let mut rows = Vec::new();
    for mut candidate in source.read_all()? {
        let mut decision = policy.prescreen(&candidate);
        if decision.is_accept() {
            decision = match fetcher.fetch(&candidate.source_url) {
                Ok(payload) => {
                    candidate.attach_payload(payload);
                    policy.evaluate(&candidate)
                }
                Err(e) => PolicyDecision::Reject {
                    predicate: "fetch".to_string(),
                    reason: e.to_string(),
                },
            };
        }
        rows.push((candidate.external_id, decision));
    }

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            for (external_id, decision) in &rows {
                let line = match decision {
                    PolicyDecision::Accept => {
                        format!("{} {}", style("✓").green(), external_id)
                    }
                    PolicyDecision::Reject { predicate, reason } => format!(
                        "{} {} {} {}",
                        style("✗").red(),
                        external_id,
                        style(predicate).yellow(),
                        style(reason).dim()
                    ),
                };
                term.write_line(&line).ok();
            }
            let accepted = rows.iter().filter(|(_, d)| d.is_accept()).count();
            term.write_line(&format!(
                "\n  {} of {} candidates pass policy",
                style(accepted).cyan(),
                rows.len()
            ))
            .ok();
        }
        OutputFormat::Json => {
            let value = serde_json::json!(rows
                .iter()
                .map(|(external_id, decision)| serde_json::json!({
                    "external_id": external_id,
                    "accepted": decision.is_accept(),
                    "rejected_by": decision.rejected_by(),
                }))
                .collect::<Vec<_>>());
            print_json(&value);
        }
    }

    Ok(())
}

fn run_stats(settings: &RelayConfig, output: OutputFormat) -> Result<()> {
    if !settings.store_path.exists() {
        return Err(RelayError::Config(format!(
            "no dedupe store at {}",
            settings.store_path.display()
        )));
    }
    let stats: StoreStats = open_store(settings)?.stats()?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            term.write_line(&format!(
                "  {} identities reserved",
                style(stats.total_records).cyan()
            ))
            .ok();
            if let Some(oldest) = stats.oldest_reservation {
                term.write_line(&format!("  oldest: {}", format_local(oldest))).ok();
            }
            if let Some(newest) = stats.newest_reservation {
                term.write_line(&format!("  newest: {}", format_local(newest))).ok();
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": settings.store_path,
            "total_records": stats.total_records,
            "oldest_reservation": stats.oldest_reservation.map(format_rfc3339),
            "newest_reservation": stats.newest_reservation.map(format_rfc3339),
        })),
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to render json: {}", e),
    }
}

fn format_local(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn format_rfc3339(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339()
}
