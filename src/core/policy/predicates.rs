//! Built-in policy predicates.

use super::{AspectRatioRange, Predicate};
use crate::core::candidate::Candidate;

/// `source_url` must not be empty
pub struct HasUrl;

impl Predicate for HasUrl {
    fn name(&self) -> &'static str {
        "hasUrl"
    }

    fn check(&self, candidate: &Candidate) -> Result<(), String> {
        if candidate.source_url.trim().is_empty() {
            return Err("candidate has no source url".to_string());
        }
        Ok(())
    }
}

/// Score must reach a threshold
pub struct MinScore {
    pub threshold: i64,
}

impl Predicate for MinScore {
    fn name(&self) -> &'static str {
        "minScore"
    }

    fn check(&self, candidate: &Candidate) -> Result<(), String> {
        let score = candidate.signals.score;
        if score < self.threshold {
            return Err(format!("score {} is below {}", score, self.threshold));
        }
        Ok(())
    }
}

/// Neither restricted nor pinned
pub struct NotFlagged;

impl Predicate for NotFlagged {
    fn name(&self) -> &'static str {
        "notFlagged"
    }

    fn check(&self, candidate: &Candidate) -> Result<(), String> {
        if candidate.signals.restricted {
            return Err("candidate is flagged restricted".to_string());
        }
        if candidate.signals.pinned {
            return Err("candidate is pinned".to_string());
        }
        Ok(())
    }
}

/// Url must end in one of the allowed extensions
pub struct ExtensionAllowed {
    /// Lowercased, each with a leading dot
    extensions: Vec<String>,
}

impl ExtensionAllowed {
    pub fn new(extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        Self { extensions }
    }
}

impl Predicate for ExtensionAllowed {
    fn name(&self) -> &'static str {
        "extensionAllowed"
    }

    fn check(&self, candidate: &Candidate) -> Result<(), String> {
        match candidate.url_extension() {
            Some(ext) if self.extensions.contains(&ext) => Ok(()),
            Some(ext) => Err(format!("extension {ext} is not allowed")),
            None => Err("url has no file extension".to_string()),
        }
    }
}

/// Decoded width/height ratio must fall inside `[low, high]`
pub struct AspectRatioInRange {
    pub range: AspectRatioRange,
}

impl Predicate for AspectRatioInRange {
    fn name(&self) -> &'static str {
        "aspectRatioInRange"
    }

    fn needs_payload(&self) -> bool {
        true
    }

    fn check(&self, candidate: &Candidate) -> Result<(), String> {
        let Some(dimensions) = candidate.dimensions else {
            return Err("image dimensions unavailable".to_string());
        };
        let Some(ratio) = dimensions.aspect_ratio() else {
            return Err("image has zero height".to_string());
        };

        if ratio < self.range.low || ratio > self.range.high {
            return Err(format!(
                "aspect ratio {:.2} outside [{:.2}, {:.2}]",
                ratio, self.range.low, self.range.high
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Signals;
    use crate::core::media::Dimensions;

    fn candidate(url: &str) -> Candidate {
        Candidate::new("t3_a", "title", url, Signals::default())
    }

    #[test]
    fn has_url_rejects_blank() {
        assert!(HasUrl.check(&candidate("   ")).is_err());
        assert!(HasUrl.check(&candidate("/a.jpg")).is_ok());
    }

    #[test]
    fn min_score_is_inclusive() {
        let predicate = MinScore { threshold: 25 };
        let mut c = candidate("/a.jpg");
        c.signals.score = 25;
        assert!(predicate.check(&c).is_ok());
        c.signals.score = 24;
        assert!(predicate.check(&c).is_err());
    }

    #[test]
    fn extension_normalizes_configuration() {
        let predicate = ExtensionAllowed::new(&["JPG".to_string(), ".png".to_string()]);
        assert!(predicate.check(&candidate("https://x.test/a.jpg")).is_ok());
        assert!(predicate.check(&candidate("https://x.test/a.PNG")).is_ok());
        assert!(predicate.check(&candidate("https://x.test/a.gif")).is_err());
    }

    #[test]
    fn aspect_ratio_bounds_are_inclusive() {
        let predicate = AspectRatioInRange {
            range: AspectRatioRange { low: 0.5, high: 2.0 },
        };
        let mut c = candidate("/a.jpg");

        c.dimensions = Some(Dimensions::new(200, 100));
        assert!(predicate.check(&c).is_ok());
        c.dimensions = Some(Dimensions::new(50, 100));
        assert!(predicate.check(&c).is_ok());
        c.dimensions = Some(Dimensions::new(49, 100));
        assert!(predicate.check(&c).is_err());
    }

    #[test]
    fn aspect_ratio_rejects_narrow_and_wide() {
        let predicate = AspectRatioInRange {
            range: AspectRatioRange::default(),
        };
        let mut c = candidate("/a.jpg");

        c.dimensions = Some(Dimensions::new(100, 200));
        assert!(predicate.check(&c).is_err());
        c.dimensions = Some(Dimensions::new(300, 100));
        assert!(predicate.check(&c).is_err());
    }

    #[test]
    fn aspect_ratio_needs_dimensions() {
        let predicate = AspectRatioInRange {
            range: AspectRatioRange::default(),
        };
        assert!(predicate.needs_payload());
        assert!(predicate.check(&candidate("/a.jpg")).is_err());
    }
}
