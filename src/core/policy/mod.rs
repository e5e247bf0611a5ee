//! # Policy Module
//!
//! Business rules a candidate must pass before it may be published.
//!
//! ## Chain
//! Predicates run in order and the chain stops at the first rejection:
//! 1. `hasUrl` - source url is non-empty
//! 2. `minScore` - score at or above the threshold
//! 3. `notFlagged` - neither restricted nor pinned
//! 4. `extensionAllowed` - url ends with an allowed extension
//! 5. `aspectRatioInRange` - decoded width/height inside `[low, high]`
//!
//! Policy rejections are never recorded in the dedupe store, so the same
//! content can still go out later if it starts passing.

mod predicates;

pub use predicates::{AspectRatioInRange, ExtensionAllowed, HasUrl, MinScore, NotFlagged};

use crate::core::candidate::Candidate;
use serde::{Deserialize, Serialize};

/// Inclusive window of acceptable width/height ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatioRange {
    pub low: f64,
    pub high: f64,
}

impl Default for AspectRatioRange {
    fn default() -> Self {
        Self {
            low: 0.80,
            high: 1.90,
        }
    }
}

/// Thresholds for the built-in predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub min_score: i64,
    pub allowed_extensions: Vec<String>,
    pub aspect_ratio: AspectRatioRange,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_score: 25,
            allowed_extensions: vec![".jpg".to_string()],
            aspect_ratio: AspectRatioRange::default(),
        }
    }
}

/// Outcome of running the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyDecision {
    Accept,
    Reject {
        /// Name of the predicate that failed
        predicate: String,
        /// Human-readable explanation
        reason: String,
    },
}

impl PolicyDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, PolicyDecision::Accept)
    }

    /// Name of the failing predicate, if rejected
    pub fn rejected_by(&self) -> Option<&str> {
        match self {
            PolicyDecision::Accept => None,
            PolicyDecision::Reject { predicate, .. } => Some(predicate.as_str()),
        }
    }
}

/// A single named check in the chain
pub trait Predicate: Send + Sync {
    /// Stable name reported on rejection
    fn name(&self) -> &'static str;

    /// Whether the check reads payload-derived metadata
    fn needs_payload(&self) -> bool {
        false
    }

    /// `Err(reason)` rejects the candidate
    fn check(&self, candidate: &Candidate) -> Result<(), String>;
}

/// Ordered, short-circuiting predicate chain
pub struct PolicyFilter {
    predicates: Vec<Box<dyn Predicate>>,
}

impl PolicyFilter {
    /// Build the default chain from thresholds
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            predicates: vec![
                Box::new(HasUrl),
                Box::new(MinScore {
                    threshold: config.min_score,
                }),
                Box::new(NotFlagged),
                Box::new(ExtensionAllowed::new(&config.allowed_extensions)),
                Box::new(AspectRatioInRange {
                    range: config.aspect_ratio,
                }),
            ],
        }
    }

    /// Append a custom predicate at the end of the chain
    pub fn with_predicate(mut self, predicate: Box<dyn Predicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Names of the predicates, in evaluation order
    pub fn predicate_names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    /// Run the full chain
    pub fn evaluate(&self, candidate: &Candidate) -> PolicyDecision {
        Self::run(self.predicates.iter(), candidate)
    }

    /// Run only the predicates that work without the payload.
    ///
    /// Lets callers skip fetching bytes for candidates that fail cheap checks.
    pub fn prescreen(&self, candidate: &Candidate) -> PolicyDecision {
        Self::run(
            self.predicates.iter().filter(|p| !p.needs_payload()),
            candidate,
        )
    }

    fn run<'a>(
        predicates: impl Iterator<Item = &'a Box<dyn Predicate>>,
        candidate: &Candidate,
    ) -> PolicyDecision {
        for predicate in predicates {
            if let Err(reason) = predicate.check(candidate) {
                return PolicyDecision::Reject {
                    predicate: predicate.name().to_string(),
                    reason,
                };
            }
        }
        PolicyDecision::Accept
    }
}

impl Default for PolicyFilter {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Signals;
    use crate::core::media::Dimensions;

    fn candidate(score: i64, url: &str, dims: (u32, u32)) -> Candidate {
        let mut candidate = Candidate::new(
            "t3_a",
            "title",
            url,
            Signals {
                score,
                ..Signals::default()
            },
        );
        candidate.dimensions = Some(Dimensions::new(dims.0, dims.1));
        candidate
    }

    #[test]
    fn low_score_is_rejected_by_min_score() {
        let decision = PolicyFilter::default().evaluate(&candidate(10, "/a.jpg", (100, 100)));
        assert_eq!(decision.rejected_by(), Some("minScore"));
    }

    #[test]
    fn png_is_rejected_by_extension() {
        let decision = PolicyFilter::default().evaluate(&candidate(100, "/a.png", (100, 100)));
        assert_eq!(decision.rejected_by(), Some("extensionAllowed"));
    }

    #[test]
    fn wide_image_is_rejected_by_aspect_ratio() {
        let decision = PolicyFilter::default().evaluate(&candidate(100, "/a.jpg", (300, 100)));
        assert_eq!(decision.rejected_by(), Some("aspectRatioInRange"));
    }

    #[test]
    fn good_candidate_is_accepted() {
        let decision = PolicyFilter::default().evaluate(&candidate(100, "/a.jpg", (100, 100)));
        assert!(decision.is_accept());
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let mut c = candidate(10, "", (300, 100));
        c.signals.pinned = true;

        let decision = PolicyFilter::default().evaluate(&c);
        assert_eq!(decision.rejected_by(), Some("hasUrl"));
    }

    #[test]
    fn flagged_candidates_are_rejected() {
        let mut c = candidate(100, "/a.jpg", (100, 100));
        c.signals.restricted = true;
        assert_eq!(
            PolicyFilter::default().evaluate(&c).rejected_by(),
            Some("notFlagged")
        );
    }

    #[test]
    fn prescreen_ignores_payload_predicates() {
        let mut c = candidate(100, "/a.jpg", (1, 1));
        c.dimensions = None;

        let filter = PolicyFilter::default();
        assert!(filter.prescreen(&c).is_accept());
        assert_eq!(filter.evaluate(&c).rejected_by(), Some("aspectRatioInRange"));
    }

    #[test]
    fn custom_predicates_run_last() {
        struct NoCats;
        impl Predicate for NoCats {
            fn name(&self) -> &'static str {
                "noCats"
            }
            fn check(&self, candidate: &Candidate) -> Result<(), String> {
                if candidate.title.contains("cat") {
                    return Err("no cats".to_string());
                }
                Ok(())
            }
        }

        let filter = PolicyFilter::default().with_predicate(Box::new(NoCats));
        let mut c = candidate(100, "/a.jpg", (100, 100));
        c.title = "a cat".to_string();

        assert_eq!(filter.predicate_names().last(), Some(&"noCats"));
        assert_eq!(filter.evaluate(&c).rejected_by(), Some("noCats"));
    }
}
