//! Caption composition.

use serde::{Deserialize, Serialize};

/// Caption settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Appended after the separator, verbatim
    pub hashtags: Vec<String>,
    pub separator: String,
    /// Limit in characters
    pub max_len: usize,
    /// Replaces the title when the full caption would be too long
    pub fallback_title: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            hashtags: Vec::new(),
            separator: "\n----------------\n\n\n".to_string(),
            max_len: 2200,
            fallback_title: "Caption this!".to_string(),
        }
    }
}

/// Builds captions from candidate titles
#[derive(Debug, Clone, Default)]
pub struct CaptionBuilder {
    config: CaptionConfig,
}

impl CaptionBuilder {
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    /// Compose `title + separator + hashtags`.
    ///
    /// Falls back to the configured fallback title when the result would
    /// exceed `max_len` characters. The fallback caption is not truncated.
    pub fn build(&self, title: &str) -> String {
        let caption = self.compose(title);
        if caption.chars().count() > self.config.max_len {
            return self.compose(&self.config.fallback_title);
        }
        caption
    }

    fn compose(&self, title: &str) -> String {
        if self.config.hashtags.is_empty() {
            return title.to_string();
        }
        format!(
            "{}{}{}",
            title,
            self.config.separator,
            self.config.hashtags.join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CaptionBuilder {
        CaptionBuilder::new(CaptionConfig {
            hashtags: vec!["#meme".to_string(), "#lol".to_string()],
            separator: " | ".to_string(),
            ..CaptionConfig::default()
        })
    }

    #[test]
    fn joins_title_and_hashtags() {
        assert_eq!(builder().build("Monday"), "Monday | #meme #lol");
    }

    #[test]
    fn long_titles_use_fallback() {
        let title = "x".repeat(2300);
        assert_eq!(builder().build(&title), "Caption this! | #meme #lol");
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let builder = CaptionBuilder::new(CaptionConfig {
            max_len: 3,
            ..CaptionConfig::default()
        });
        assert_eq!(builder.build("äöü"), "äöü");
    }

    #[test]
    fn no_hashtags_means_title_only() {
        let builder = CaptionBuilder::default();
        assert_eq!(builder.build("plain"), "plain");
    }
}
