//! End-to-end run orchestration.
//!
//! A run is strictly sequential: each stage is awaited before the next one
//! starts. Only the draft and the publish stages can end a run; every other
//! stage degrades to a fallback value.

use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::config::QuillConfig;
use crate::cover::resolve_cover;
use crate::document::{PublishedDocument, derive_tags, strip_leading_title};
use crate::feed::{FeedSource, HttpFeedSource};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::generation::{ChatClient, Generator};
use crate::image::{ImageHost, ImageRef, PollinationsHost};
use crate::inject::inject_images;
use crate::normalize::normalize;
use crate::publish::{HashnodeTransport, PublishOutcome, PublishReceipt, PublishTransport, Publisher};
use crate::seo::generate_seo;
use crate::topic::{Topic, select_topic};
use crate::writer::write_article;

/// External collaborators of a run.
#[derive(Clone)]
pub struct Services {
    pub feeds: Arc<dyn FeedSource>,
    pub pages: Arc<dyn PageFetcher>,
    pub generator: Arc<dyn Generator>,
    pub images: Arc<dyn ImageHost>,
    pub transport: Arc<dyn PublishTransport>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Builds the HTTP-backed collaborators.
    pub fn from_config(config: &QuillConfig) -> Result<Self> {
        Ok(Self {
            feeds: Arc::new(HttpFeedSource::new(config.fetch.clone())?),
            pages: Arc::new(HttpFetcher::new(config.fetch.clone())?),
            generator: Arc::new(ChatClient::new(config.generation.clone())?),
            images: Arc::new(PollinationsHost::new(config.image.clone(), &config.fetch.user_agent)?),
            transport: Arc::new(HashnodeTransport::new(&config.publish)?),
        })
    }
}

/// The stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Topic,
    Cover,
    Draft,
    Normalize,
    Inject,
    Prepare,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 7] =
        [Stage::Topic, Stage::Cover, Stage::Draft, Stage::Normalize, Stage::Inject, Stage::Prepare, Stage::Publish];

    /// One-based position of the stage.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).map_or(0, |i| i + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Topic => "Selecting a topic",
            Stage::Cover => "Resolving the cover image",
            Stage::Draft => "Drafting the article",
            Stage::Normalize => "Cleaning up the draft",
            Stage::Inject => "Placing illustrations",
            Stage::Prepare => "Preparing metadata",
            Stage::Publish => "Publishing",
        }
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Started(Stage),
    Finished(Stage, String),
}

/// Whether the final mutation is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Publish,
    /// Everything but the publish calls.
    DryRun,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub topic: Topic,
    pub cover: ImageRef,
    pub inline_images: Vec<ImageRef>,
    pub document: PublishedDocument,
    /// `None` for dry runs.
    pub receipt: Option<PublishReceipt>,
}

/// One configured pipeline.
#[derive(Debug)]
pub struct Pipeline {
    services: Services,
    config: QuillConfig,
}

impl Pipeline {
    pub fn new(services: Services, config: QuillConfig) -> Self {
        Self { services, config }
    }

    pub fn config(&self) -> &QuillConfig {
        &self.config
    }

    /// Checks that the generation service is reachable with our credentials.
    pub async fn check(&self) -> Result<()> {
        self.services.generator.probe().await
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Fails when the article cannot be drafted or the publish endpoint
    /// rejects the run. Every other failure is absorbed by a fallback.
    pub async fn run(&self, mode: RunMode, on_progress: &mut (dyn FnMut(Progress) + Send)) -> Result<RunReport> {
        let services = &self.services;
        let config = &self.config;
        let generator = services.generator.as_ref();
        let theme = config.image.style_profiles.first().map(String::as_str).unwrap_or_default();

        on_progress(Progress::Started(Stage::Topic));
        let topic =
            select_topic(services.feeds.as_ref(), generator, &config.topic, &config.writing.language).await;
        tracing::info!(title = %topic.title, source = %topic.source_link, "topic selected");
        on_progress(Progress::Finished(Stage::Topic, topic.title.clone()));

        on_progress(Progress::Started(Stage::Cover));
        let cover =
            resolve_cover(&topic, services.pages.as_ref(), generator, services.images.as_ref(), &config.image).await;
        on_progress(Progress::Finished(Stage::Cover, format!("{} ({})", cover.url, cover.origin.as_str())));

        on_progress(Progress::Started(Stage::Draft));
        let draft = write_article(&topic, generator, &config.writing).await?;
        on_progress(Progress::Finished(Stage::Draft, format!("{} words", draft.split_whitespace().count())));

        on_progress(Progress::Started(Stage::Normalize));
        let body = normalize(&draft, generator, &config.writing).await;
        let detail = if config.writing.normalize { "done" } else { "skipped" };
        on_progress(Progress::Finished(Stage::Normalize, detail.to_string()));

        on_progress(Progress::Started(Stage::Inject));
        let injected = inject_images(
            &body,
            &topic.title,
            services.images.as_ref(),
            theme,
            config.writing.max_fallback_images,
        )
        .await;
        on_progress(Progress::Finished(Stage::Inject, format!("{} images", injected.images.len())));

        on_progress(Progress::Started(Stage::Prepare));
        let publisher = Publisher::new(services.transport.as_ref(), &config.publish);
        let publication_id = match mode {
            RunMode::Publish => Some(publisher.publication_id().await?),
            RunMode::DryRun => None,
        };
        let seo = generate_seo(&topic.title, &strip_leading_title(&injected.markdown), generator).await;
        let tags = derive_tags(&config.publish.tags, &topic.keywords, config.publish.max_tags);
        let document = PublishedDocument::assemble(
            &topic.title,
            &injected.markdown,
            &config.writing.signature,
            seo,
            Some(cover.clone()),
            tags,
        );
        on_progress(Progress::Finished(Stage::Prepare, document.slug.clone()));

        let receipt = match publication_id {
            Some(publication_id) => {
                on_progress(Progress::Started(Stage::Publish));
                let receipt = publisher.publish(&document, &publication_id).await?;
                tracing::info!(outcome = ?receipt.outcome, cover_dropped = receipt.cover_dropped, "publish finished");
                let detail = match &receipt.outcome {
                    PublishOutcome::Published { url } => url.clone(),
                    PublishOutcome::Unconfirmed => "submitted, no URL returned".to_string(),
                };
                on_progress(Progress::Finished(Stage::Publish, detail));
                Some(receipt)
            }
            None => {
                tracing::info!("dry run, skipping publish");
                None
            }
        };

        Ok(RunReport { topic, cover, inline_images: injected.images, document, receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numbers() {
        assert_eq!(Stage::Topic.number(), 1);
        assert_eq!(Stage::Publish.number(), 7);
        assert_eq!(Stage::ALL.len(), 7);
    }

    #[test]
    fn test_services_from_config() {
        let config = QuillConfig::builder().generation_api_key("g").publish_api_key("p").build();
        let services = Services::from_config(&config).unwrap();
        assert!(format!("{:?}", services).starts_with("Services"));
    }
}
