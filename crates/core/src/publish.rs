//! Hashnode GraphQL publishing.
//!
//! Two calls are made per run: one query resolving the account's first
//! publication and one `publishPost` mutation. When the platform rejects the
//! cover image, the mutation is repeated once without it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::PublishConfig;
use crate::document::PublishedDocument;
use crate::fetch::map_request_error;
use crate::generation::truncate_for_log;
use crate::{QuillError, Result};

pub const PUBLICATION_QUERY: &str = "query { me { publications(first: 1) { edges { node { id } } } } }";

pub const PUBLISH_MUTATION: &str = "mutation PublishPost($input: PublishPostInput!) {
  publishPost(input: $input) {
    post { url }
  }
}";

/// GraphQL transport.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Sends one GraphQL document and returns the decoded response body,
    /// `errors` included.
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value>;
}

/// [`PublishTransport`] for the Hashnode endpoint.
pub struct HashnodeTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: u64,
}

impl fmt::Debug for HashnodeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashnodeTransport")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HashnodeTransport {
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(QuillError::HttpError)?;
        Ok(Self { client, endpoint: config.endpoint.clone(), api_key: config.api_key.clone(), timeout: config.timeout })
    }
}

#[async_trait]
impl PublishTransport for HashnodeTransport {
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        let mut body = json!({ "query": query });
        if let Some(variables) = variables {
            body["variables"] = variables;
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| map_request_error(e, self.timeout))?;

        let parsed = serde_json::from_str::<Value>(&text);
        if status.is_success() {
            return parsed.map_err(QuillError::SerializationError);
        }

        // GraphQL errors may ride on a non-2xx status; anything else is a transport failure.
        match parsed {
            Ok(value) if !graphql_errors(&value).is_empty() => Ok(value),
            _ => Err(QuillError::publish(format!("endpoint returned {}: {}", status, truncate_for_log(&text, 300)))),
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The platform returned the post URL.
    Published { url: String },
    /// The platform reported no error but returned no URL.
    Unconfirmed,
}

/// A submission's outcome and whether the cover had to be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub outcome: PublishOutcome,
    pub cover_dropped: bool,
}

/// Collects the messages of a GraphQL `errors` array.
pub fn graphql_errors(response: &Value) -> Vec<String> {
    match response.get("errors") {
        Some(Value::Array(errors)) => errors
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => e.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

fn mentions_cover(errors: &[String]) -> bool {
    errors.iter().any(|e| e.contains("coverImage"))
}

/// Submits documents through a [`PublishTransport`].
pub struct Publisher<'a> {
    transport: &'a dyn PublishTransport,
    config: &'a PublishConfig,
}

impl<'a> Publisher<'a> {
    pub fn new(transport: &'a dyn PublishTransport, config: &'a PublishConfig) -> Self {
        Self { transport, config }
    }

    /// Resolves the id of the account's first publication.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::PublishError`] when the response carries errors
    /// or no publication.
    pub async fn publication_id(&self) -> Result<String> {
        let response = self.transport.execute(PUBLICATION_QUERY, None).await?;

        let errors = graphql_errors(&response);
        if !errors.is_empty() {
            return Err(QuillError::PublishError { errors });
        }

        response
            .pointer("/data/me/publications/edges/0/node/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| QuillError::publish("no publication found for this account"))
    }

    /// Builds the `PublishPostInput` object.
    pub fn build_input(&self, doc: &PublishedDocument, publication_id: &str, include_cover: bool) -> Value {
        let tags: Vec<Value> = doc.tags.iter().map(|t| json!({ "slug": t.slug, "name": t.name })).collect();

        let mut input = json!({
            "title": doc.title,
            "contentMarkdown": doc.markdown_body,
            "publicationId": publication_id,
            "slug": doc.slug,
            "metaTags": {
                "title": doc.meta_title,
                "description": doc.meta_description,
            },
            "tags": tags,
        });

        if include_cover && let Some(cover) = &doc.cover_image {
            input["coverImageOptions"] = json!({
                "coverImageURL": cover.url,
                "isCoverAttributionHidden": self.config.hide_cover_attribution,
            });
        }

        input
    }

    async fn submit(&self, doc: &PublishedDocument, publication_id: &str, include_cover: bool) -> Result<Value> {
        let variables = json!({ "input": self.build_input(doc, publication_id, include_cover) });
        self.transport.execute(PUBLISH_MUTATION, Some(variables)).await
    }

    /// Publishes the document.
    ///
    /// A rejection that mentions the cover image is retried exactly once with
    /// the cover removed; the retry's result is final.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::PublishError`] for any other rejection and
    /// transport errors as-is.
    pub async fn publish(&self, doc: &PublishedDocument, publication_id: &str) -> Result<PublishReceipt> {
        let has_cover = doc.cover_image.is_some();
        let response = self.submit(doc, publication_id, has_cover).await?;
        let errors = graphql_errors(&response);

        if errors.is_empty() {
            return Ok(PublishReceipt { outcome: outcome_of(&response), cover_dropped: false });
        }

        if !(has_cover && mentions_cover(&errors)) {
            return Err(QuillError::PublishError { errors });
        }

        tracing::warn!(errors = %errors.join("; "), "cover image rejected, retrying without it");
        let response = self.submit(doc, publication_id, false).await?;
        let errors = graphql_errors(&response);
        if !errors.is_empty() {
            return Err(QuillError::PublishError { errors });
        }

        Ok(PublishReceipt { outcome: outcome_of(&response), cover_dropped: true })
    }
}

fn outcome_of(response: &Value) -> PublishOutcome {
    match response.pointer("/data/publishPost/post/url").and_then(Value::as_str) {
        Some(url) if !url.is_empty() => PublishOutcome::Published { url: url.to_string() },
        _ => {
            tracing::warn!("publish succeeded without returning a post URL");
            PublishOutcome::Unconfirmed
        }
    }
}
