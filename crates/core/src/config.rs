//! Run configuration.
//!
//! [`QuillConfig`] is built once at process start (usually by the CLI) and
//! handed to [`crate::Services::from_config`] and [`crate::Pipeline`]. Nothing
//! in the crate reads environment variables or global state on its own.
//!
//! # Example
//!
//! ```rust
//! use quill_core::QuillConfig;
//!
//! let config = QuillConfig::builder()
//!     .generation_api_key("gen-key")
//!     .publish_api_key("pub-key")
//!     .placeholder_count(3)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use url::Url;

use crate::document::Tag;
use crate::fetch::FetchConfig;
use crate::{QuillError, Result};

/// Feeds scanned when no feed list is configured.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://news.ycombinator.com/rss",
    "https://feeds.feedburner.com/TechCrunch/",
    "https://www.wired.com/feed/category/science/latest/rss",
    "https://spectrum.ieee.org/feeds/topic/artificial-intelligence",
    "https://dev.to/feed/tag/engineering",
];

/// Visual styles the art-direction call picks from.
pub const DEFAULT_STYLE_PROFILES: &[&str] = &[
    "minimalist vector art, engineering blueprint style, orange and dark grey color palette, high quality",
    "isometric 3D illustration, soft studio lighting, muted pastel palette, clean background",
    "editorial photograph, shallow depth of field, natural light, documentary style",
    "flat geometric illustration, bold primary colors, Swiss design poster layout",
];

/// Topic selection settings.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Feed URLs, scanned in order.
    pub feeds: Vec<String>,
    /// Entries read from each feed.
    pub entries_per_feed: usize,
    /// Headline lines kept in the prompt after shuffling.
    pub max_context_lines: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            entries_per_feed: 3,
            max_context_lines: 15,
        }
    }
}

/// Generation service settings (OpenAI-compatible chat completions).
#[derive(Clone)]
pub struct GenerationConfig {
    /// Bearer token.
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds. Article drafts are slow, so this is generous.
    pub timeout: u64,
    /// Sampling temperature for creative calls.
    pub temperature: f32,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout: 180,
            temperature: 0.7,
        }
    }
}

/// How long to wait for the remote renderer to materialize an image.
///
/// The image endpoint gives no completion signal, so readiness is polled with
/// a bounded number of attempts instead of sleeping for a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Maximum number of probes. Zero disables probing.
    pub attempts: u32,
    /// Delay between probes.
    pub interval: Duration,
}

impl ReadinessPolicy {
    /// A policy that never probes.
    pub const fn disabled() -> Self {
        Self { attempts: 0, interval: Duration::ZERO }
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self { attempts: 6, interval: Duration::from_secs(5) }
    }
}

/// Image synthesis settings.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Prompt endpoint; the encoded prompt is appended as a path segment.
    pub endpoint: String,
    pub width: u32,
    pub height: u32,
    /// Renderer selection passed as the `model` query parameter.
    pub renderer: String,
    /// Style profiles offered to the art-direction call.
    pub style_profiles: Vec<String>,
    /// Whether the cover prompt is refined by an art-direction call.
    pub art_direction: bool,
    /// Whether a synthesized cover is judged once and re-rendered on rejection.
    pub cover_review: bool,
    pub readiness: ReadinessPolicy,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://image.pollinations.ai/prompt/".to_string(),
            width: 1280,
            height: 720,
            renderer: "flux".to_string(),
            style_profiles: DEFAULT_STYLE_PROFILES.iter().map(|s| s.to_string()).collect(),
            art_direction: true,
            cover_review: true,
            readiness: ReadinessPolicy::default(),
        }
    }
}

/// Article writing and cleanup settings.
#[derive(Debug, Clone)]
pub struct WritingConfig {
    /// Language the article is written in.
    pub language: String,
    /// Minimum article length requested from the generator.
    pub min_words: usize,
    /// Placeholder markers requested from the generator (at least 2).
    pub placeholder_count: usize,
    /// Closing attribution line; always present in the published body.
    pub signature: String,
    /// Whether the normalizer stage runs.
    pub normalize: bool,
    /// Images injected after headings when the draft carries no markers.
    pub max_fallback_images: usize,
}

impl Default for WritingConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            min_words: 1500,
            placeholder_count: 2,
            signature: "*Written by the Quill editorial desk.*".to_string(),
            normalize: true,
            max_fallback_images: 3,
        }
    }
}

/// Publish endpoint settings.
#[derive(Clone)]
pub struct PublishConfig {
    /// Bearer token for the GraphQL endpoint.
    pub api_key: String,
    pub endpoint: String,
    /// Tags always attached to the post.
    pub tags: Vec<Tag>,
    /// Upper bound on tags, configured plus keyword-derived.
    pub max_tags: usize,
    pub hide_cover_attribution: bool,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl std::fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("tags", &self.tags)
            .field("max_tags", &self.max_tags)
            .field("hide_cover_attribution", &self.hide_cover_attribution)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://gql.hashnode.com/".to_string(),
            tags: vec![Tag::new("Engineering")],
            max_tags: 4,
            hide_cover_attribution: true,
            timeout: 30,
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct QuillConfig {
    /// Feed and page fetching (10 second timeout by default).
    pub fetch: FetchConfig,
    pub topic: TopicConfig,
    pub generation: GenerationConfig,
    pub image: ImageConfig,
    pub writing: WritingConfig,
    pub publish: PublishConfig,
}

impl QuillConfig {
    /// Creates a new builder for QuillConfig.
    pub fn builder() -> QuillConfigBuilder {
        QuillConfigBuilder::new()
    }

    /// Checks credentials and URLs before any network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::ConfigError`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.validate_dry_run()?;
        if self.publish.api_key.trim().is_empty() {
            return Err(QuillError::ConfigError("publish API key is not set".to_string()));
        }
        Ok(())
    }

    /// Like [`QuillConfig::validate`], without requiring publish credentials.
    pub fn validate_dry_run(&self) -> Result<()> {
        if self.generation.api_key.trim().is_empty() {
            return Err(QuillError::ConfigError("generation API key is not set".to_string()));
        }
        for feed in &self.topic.feeds {
            Url::parse(feed).map_err(|e| QuillError::ConfigError(format!("invalid feed URL '{}': {}", feed, e)))?;
        }
        for (name, url) in [
            ("generation base URL", &self.generation.base_url),
            ("image endpoint", &self.image.endpoint),
            ("publish endpoint", &self.publish.endpoint),
        ] {
            Url::parse(url).map_err(|e| QuillError::ConfigError(format!("invalid {} '{}': {}", name, url, e)))?;
        }
        if self.writing.placeholder_count < 2 {
            return Err(QuillError::ConfigError("placeholder count must be at least 2".to_string()));
        }
        Ok(())
    }
}

/// Builder for QuillConfig.
pub struct QuillConfigBuilder {
    config: QuillConfig,
}

impl QuillConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: QuillConfig::default() }
    }

    pub fn generation_api_key(mut self, value: impl Into<String>) -> Self {
        self.config.generation.api_key = value.into();
        self
    }

    pub fn publish_api_key(mut self, value: impl Into<String>) -> Self {
        self.config.publish.api_key = value.into();
        self
    }

    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.config.generation.model = value.into();
        self
    }

    pub fn generation_base_url(mut self, value: impl Into<String>) -> Self {
        self.config.generation.base_url = value.into();
        self
    }

    /// Replaces the feed list. An empty list keeps the defaults.
    pub fn feeds(mut self, feeds: Vec<String>) -> Self {
        if !feeds.is_empty() {
            self.config.topic.feeds = feeds;
        }
        self
    }

    /// Sets the page and feed fetch timeout in seconds.
    pub fn fetch_timeout(mut self, secs: u64) -> Self {
        self.config.fetch.timeout = secs;
        self
    }

    /// Sets the generation timeout in seconds.
    pub fn generation_timeout(mut self, secs: u64) -> Self {
        self.config.generation.timeout = secs;
        self
    }

    pub fn language(mut self, value: impl Into<String>) -> Self {
        self.config.writing.language = value.into();
        self
    }

    pub fn signature(mut self, value: impl Into<String>) -> Self {
        self.config.writing.signature = value.into();
        self
    }

    pub fn placeholder_count(mut self, value: usize) -> Self {
        self.config.writing.placeholder_count = value;
        self
    }

    pub fn normalize(mut self, value: bool) -> Self {
        self.config.writing.normalize = value;
        self
    }

    pub fn art_direction(mut self, value: bool) -> Self {
        self.config.image.art_direction = value;
        self
    }

    pub fn cover_review(mut self, value: bool) -> Self {
        self.config.image.cover_review = value;
        self
    }

    pub fn readiness(mut self, value: ReadinessPolicy) -> Self {
        self.config.image.readiness = value;
        self
    }

    /// Replaces the configured tags. An empty list keeps the defaults.
    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        if !tags.is_empty() {
            self.config.publish.tags = tags;
        }
        self
    }

    /// Builds the config.
    pub fn build(self) -> QuillConfig {
        self.config
    }
}

impl Default for QuillConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> QuillConfigBuilder {
        QuillConfig::builder().generation_api_key("g").publish_api_key("p")
    }

    #[test]
    fn test_defaults() {
        let config = QuillConfig::default();
        assert_eq!(config.topic.entries_per_feed, 3);
        assert_eq!(config.topic.max_context_lines, 15);
        assert_eq!(config.image.width, 1280);
        assert_eq!(config.image.height, 720);
        assert_eq!(config.fetch.timeout, 10);
        assert_eq!(config.generation.timeout, 180);
        assert_eq!(config.writing.max_fallback_images, 3);
    }

    #[test]
    fn test_validate_requires_keys() {
        let err = QuillConfig::builder().publish_api_key("p").build().validate().unwrap_err();
        assert!(err.to_string().contains("generation API key"));

        let err = QuillConfig::builder().generation_api_key("g").build().validate().unwrap_err();
        assert!(err.to_string().contains("publish API key"));

        assert!(valid().build().validate().is_ok());
    }

    #[test]
    fn test_dry_run_needs_no_publish_key() {
        let config = QuillConfig::builder().generation_api_key("g").build();
        assert!(config.validate_dry_run().is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_feed() {
        let config = valid().feeds(vec!["not a url".to_string()]).build();
        assert!(matches!(config.validate(), Err(QuillError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_single_placeholder() {
        let config = valid().placeholder_count(1).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_feed_list_keeps_defaults() {
        let config = valid().feeds(Vec::new()).build();
        assert_eq!(config.topic.feeds.len(), DEFAULT_FEEDS.len());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = valid().build();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("api_key: \"g\""));
    }
}
