//! # Config Module
//!
//! Settings file for the relay, read once at startup.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//! ```json
//! {
//!   "min_score": 50,
//!   "allowed_extensions": [".jpg", ".jpeg"],
//!   "aspect_ratio_range": [0.8, 1.9],
//!   "min_publish_interval_secs": 1800,
//!   "caption": { "hashtags": ["#meme", "#memes"] }
//! }
//! ```

use crate::core::policy::{AspectRatioRange, PolicyConfig};
use crate::core::publisher::CaptionConfig;
use crate::core::scheduler::{CommitPolicy, SchedulerConfig};
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub min_score: i64,
    pub allowed_extensions: Vec<String>,
    /// `[low, high]`, inclusive
    pub aspect_ratio_range: [f64; 2],
    pub min_publish_interval_secs: u64,
    pub batch_size: usize,
    pub source_backoff_secs: u64,
    pub idle_delay_secs: u64,
    pub commit_policy: CommitPolicy,
    /// Dedupe database location
    pub store_path: PathBuf,
    /// How long a store call may wait for the database lock
    pub busy_timeout_ms: u64,
    pub caption: CaptionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let policy = PolicyConfig::default();
        let scheduler = SchedulerConfig::default();
        Self {
            min_score: policy.min_score,
            allowed_extensions: policy.allowed_extensions,
            aspect_ratio_range: [policy.aspect_ratio.low, policy.aspect_ratio.high],
            min_publish_interval_secs: scheduler.min_publish_interval.as_secs(),
            batch_size: scheduler.batch_size,
            source_backoff_secs: scheduler.source_backoff.as_secs(),
            idle_delay_secs: scheduler.idle_delay.as_secs(),
            commit_policy: scheduler.commit_policy,
            store_path: default_store_path(),
            busy_timeout_ms: 5_000,
            caption: CaptionConfig::default(),
        }
    }
}

/// `<data dir>/repost-guard/dupes.db`, or `./dupes.db` without a data dir
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("repost-guard").join("dupes.db"))
        .unwrap_or_else(|| PathBuf::from("dupes.db"))
}

impl RelayConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: RelayConfig = serde_json::from_str(&contents).map_err(|e| {
            RelayError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), RelayError> {
        let [low, high] = self.aspect_ratio_range;
        if !(low > 0.0 && low <= high) {
            return Err(RelayError::Config(format!(
                "aspect_ratio_range [{low}, {high}] must satisfy 0 < low <= high"
            )));
        }
        if self.batch_size == 0 {
            return Err(RelayError::Config("batch_size must be at least 1".to_string()));
        }
        if self.allowed_extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(RelayError::Config(
                "allowed_extensions must name at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            min_score: self.min_score,
            allowed_extensions: self.allowed_extensions.clone(),
            aspect_ratio: AspectRatioRange {
                low: self.aspect_ratio_range[0],
                high: self.aspect_ratio_range[1],
            },
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.batch_size,
            min_publish_interval: Duration::from_secs(self.min_publish_interval_secs),
            source_backoff: Duration::from_secs(self.source_backoff_secs),
            idle_delay: Duration::from_secs(self.idle_delay_secs),
            commit_policy: self.commit_policy,
            max_batches: None,
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_policy_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.policy(), PolicyConfig::default());
        assert_eq!(config.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "min_score": 50, "commit_policy": "commit_after_publish" }"#,
        )
        .unwrap();

        let config = RelayConfig::load(&path).unwrap();

        assert_eq!(config.min_score, 50);
        assert_eq!(config.commit_policy, CommitPolicy::CommitAfterPublish);
        assert_eq!(config.allowed_extensions, vec![".jpg".to_string()]);
        assert_eq!(config.scheduler().min_publish_interval, Duration::from_secs(60));
    }

    #[test]
    fn inverted_ratio_range_is_rejected() {
        let config = RelayConfig {
            aspect_ratio_range: [1.9, 0.8],
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn empty_extensions_are_rejected() {
        let config = RelayConfig {
            allowed_extensions: vec![" ".to_string()],
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RelayConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.json"));
    }
}
