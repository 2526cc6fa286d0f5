pub mod config;
pub mod cover;
pub mod document;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod generation;
pub mod image;
pub mod inject;
pub mod metadata;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod publish;
pub mod seo;
pub mod structured;
pub mod topic;
pub mod writer;

pub use config::{
    DEFAULT_FEEDS, GenerationConfig, ImageConfig, PublishConfig, QuillConfig, QuillConfigBuilder, ReadinessPolicy,
    TopicConfig, WritingConfig,
};
pub use cover::resolve_cover;
pub use document::{PublishedDocument, Tag};
pub use error::{QuillError, Result};
pub use feed::{FeedEntry, FeedSource, HttpFeedSource, default_feed_list_path, load_feed_list};
pub use fetch::{FetchConfig, HttpFetcher, PageFetcher};
pub use generation::{ChatClient, GenerationRequest, Generator};
pub use image::{ImageHost, ImageOrigin, ImageRef, PollinationsHost};
pub use inject::{Injected, canonicalize_markers, inject_images};
pub use metadata::extract_cover_image;
pub use normalize::{Rule, RuleKind, RuleSet, apply_rules};
pub use parse::Document;
pub use pipeline::{Pipeline, Progress, RunMode, RunReport, Services, Stage};
pub use publish::{HashnodeTransport, PublishOutcome, PublishReceipt, PublishTransport, Publisher};
pub use seo::{SeoMetadata, slugify};
pub use structured::parse_first;
pub use topic::{Topic, select_topic};
pub use writer::write_article;
