//! Image references and the synthesis endpoint.

use std::fmt;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::form_urlencoded;

use crate::Result;
use crate::config::ImageConfig;
use crate::fetch::build_client;

/// Where an illustration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Scraped from the source article and approved by a relevance check.
    Sourced,
    /// Rendered on demand from a text prompt.
    Synthesized,
}

impl ImageOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageOrigin::Sourced => "sourced",
            ImageOrigin::Synthesized => "synthesized",
        }
    }
}

/// A resolved illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub origin: ImageOrigin,
}

impl ImageRef {
    pub fn sourced(url: impl Into<String>) -> Self {
        Self { url: url.into(), origin: ImageOrigin::Sourced }
    }

    pub fn synthesized(url: impl Into<String>) -> Self {
        Self { url: url.into(), origin: ImageOrigin::Synthesized }
    }
}

/// Remote text-to-image renderer.
///
/// Rendering is addressed by URL: the host hands back the address the image
/// will be served from, and the image materializes on first request.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Returns the URL of a rendering of `prompt`, using a fresh random seed.
    fn render_url(&self, prompt: &str) -> String;

    /// Waits until `url` serves an image. Returns `false` when readiness
    /// could not be confirmed.
    async fn wait_until_ready(&self, url: &str) -> bool;
}

/// Requests an image for `prompt`, optionally waiting for it to materialize.
///
/// Never fails: when readiness cannot be confirmed the URL is returned anyway.
pub async fn synthesize(host: &dyn ImageHost, prompt: &str, wait: bool) -> ImageRef {
    let url = host.render_url(prompt);
    tracing::debug!(%url, "image requested");

    if wait && !host.wait_until_ready(&url).await {
        tracing::warn!(%url, "image readiness not confirmed, using URL anyway");
    }

    ImageRef::synthesized(url)
}

/// Decorates a subject with the house visual theme.
pub fn themed_prompt(subject: &str, theme: &str) -> String {
    let subject = subject.trim().trim_end_matches(['.', ',']);
    if theme.trim().is_empty() {
        format!("{}, no text, cinematic lighting", subject)
    } else {
        format!("{}, {}, no text, cinematic lighting", subject, theme.trim())
    }
}

/// [`ImageHost`] for the Pollinations prompt endpoint.
pub struct PollinationsHost {
    client: Client,
    config: ImageConfig,
}

impl fmt::Debug for PollinationsHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollinationsHost").field("config", &self.config).finish()
    }
}

impl PollinationsHost {
    pub fn new(config: ImageConfig, user_agent: &str) -> Result<Self> {
        // Renders can take several seconds per probe.
        let client = build_client(60, user_agent)?;
        Ok(Self { client, config })
    }

    /// Builds the rendering URL for a prompt and seed.
    pub fn url_for(&self, prompt: &str, seed: u32) -> String {
        let encoded = form_urlencoded::byte_serialize(prompt.as_bytes()).collect::<String>().replace('+', "%20");
        format!(
            "{}/{}?width={}&height={}&seed={}&model={}&nologo=true",
            self.config.endpoint.trim_end_matches('/'),
            encoded,
            self.config.width,
            self.config.height,
            seed,
            self.config.renderer
        )
    }

    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let is_image = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.starts_with("image/"));
                response.status().is_success() && is_image
            }
            Err(e) => {
                tracing::debug!(error = %e, "readiness probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl ImageHost for PollinationsHost {
    fn render_url(&self, prompt: &str) -> String {
        let seed = rand::thread_rng().gen_range(0..1_000_000);
        self.url_for(prompt, seed)
    }

    async fn wait_until_ready(&self, url: &str) -> bool {
        let policy = self.config.readiness;

        for attempt in 1..=policy.attempts {
            if self.probe(url).await {
                tracing::debug!(attempt, "image ready");
                return true;
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        false
    }
}
