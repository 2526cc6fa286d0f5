//! Topic selection from feed headlines.

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::config::TopicConfig;
use crate::feed::FeedSource;
use crate::generation::{GenerationRequest, Generator};
use crate::structured::parse_first;

/// The subject of the article being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// Never empty.
    pub title: String,
    /// URL of the article the topic came from, or empty.
    pub source_link: String,
    pub summary: String,
    /// Comma-separated keywords.
    pub keywords: String,
}

impl Topic {
    /// Topic used whenever selection cannot produce a usable one.
    pub fn fallback() -> Self {
        Self {
            title: "Designing for Failure: Practical Resilience Patterns in Modern Software Systems".to_string(),
            source_link: String::new(),
            summary: "Distributed systems fail in partial and surprising ways. Retries, timeouts, circuit breakers \
                      and graceful degradation turn those failures into inconveniences. This article walks through \
                      the patterns and the trade-offs behind them."
                .to_string(),
            keywords: "resilience, distributed systems, reliability, architecture".to_string(),
        }
    }

    /// Whether the topic points at a source article.
    pub fn has_source(&self) -> bool {
        !self.source_link.trim().is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Keywords {
    Text(String),
    List(Vec<String>),
}

impl Keywords {
    fn into_string(self) -> String {
        match self {
            Keywords::Text(text) => text.trim().to_string(),
            Keywords::List(items) => items
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Deserialize)]
struct TopicPick {
    title: Option<String>,
    #[serde(alias = "source_link", alias = "link")]
    original_link: Option<String>,
    summary: Option<String>,
    keywords: Option<Keywords>,
}

impl TopicPick {
    fn into_topic(self) -> Option<Topic> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        Some(Topic {
            title,
            source_link: self.original_link.map(|l| l.trim().to_string()).unwrap_or_default(),
            summary: self.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            keywords: self.keywords.map(Keywords::into_string).unwrap_or_default(),
        })
    }
}

/// Gathers headline lines from every feed, skipping feeds that fail.
pub async fn gather_headlines(feeds: &dyn FeedSource, config: &TopicConfig) -> Vec<String> {
    let mut lines = Vec::new();

    for url in &config.feeds {
        match feeds.entries(url).await {
            Ok(entries) => {
                tracing::debug!(feed = %url, entries = entries.len(), "feed read");
                lines.extend(entries.iter().take(config.entries_per_feed).map(|e| e.to_context_line()));
            }
            Err(e) => tracing::warn!(feed = %url, error = %e, "skipping feed"),
        }
    }

    lines.shuffle(&mut rand::thread_rng());
    lines.truncate(config.max_context_lines);
    lines
}

fn topic_prompt(headlines: &[String], language: &str) -> String {
    let context = if headlines.is_empty() {
        "(no recent headlines were available; propose an evergreen engineering topic)".to_string()
    } else {
        headlines.join("\n")
    };

    format!(
        "You are the editor-in-chief of an engineering blog. Here are recent articles:\n\
         {context}\n\n\
         Pick the most relevant, technical and interesting subject for an audience of engineers \
         reading in {language}. The subject must be current.\n\n\
         Reply ONLY with a valid JSON object containing:\n\
         {{\n  \"title\": \"a catchy title in {language}\",\n  \"original_link\": \"the source link\",\n  \
         \"summary\": \"a three-sentence summary of the subject\",\n  \"keywords\": \"comma, separated, keywords\"\n}}"
    )
}

/// Selects the article topic.
///
/// Never fails: any problem along the way yields [`Topic::fallback`].
pub async fn select_topic(
    feeds: &dyn FeedSource, generator: &dyn Generator, config: &TopicConfig, language: &str,
) -> Topic {
    let headlines = gather_headlines(feeds, config).await;
    if headlines.is_empty() {
        tracing::warn!("no headlines gathered from any feed");
    }

    let request = GenerationRequest::new(topic_prompt(&headlines, language)).structured();
    let response = match generator.generate(&request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "topic selection call failed, using fallback topic");
            return Topic::fallback();
        }
    };

    match parse_first::<TopicPick>(&response).and_then(TopicPick::into_topic) {
        Some(topic) => topic,
        None => {
            tracing::warn!("topic selection returned no usable topic, using fallback topic");
            Topic::fallback()
        }
    }
}
