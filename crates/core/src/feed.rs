//! RSS/Atom feed access and feed-list files.
//!
//! [`FeedSource`] is the pull interface the topic selector reads headlines
//! from. [`HttpFeedSource`] implements it over HTTP with `feed-rs`, which
//! accepts RSS 0.9x/1.0/2.0, Atom and JSON Feed alike.
//!
//! Feed-list files are plain text with one URL per line. A `#` at line start
//! or after whitespace starts a comment, so URL fragments are kept.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;

use crate::fetch::{FetchConfig, HttpFetcher, parse_http_url};
use crate::{QuillError, Result};

/// A single headline read from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Article URL, or empty when the feed entry has none.
    pub link: String,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self { title: title.into(), link: link.into() }
    }

    /// Formats the entry as one line of topic-selection context.
    pub fn to_context_line(&self) -> String {
        format!("- {} (Link: {})", self.title, self.link)
    }
}

/// Pull interface over feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns the entries of the feed at `url`, in feed order.
    async fn entries(&self, url: &str) -> Result<Vec<FeedEntry>>;
}

/// [`FeedSource`] that downloads and parses feeds over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    fetcher: HttpFetcher,
}

impl HttpFeedSource {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self { fetcher: HttpFetcher::new(config)? })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn entries(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        parse_feed(&bytes)
    }
}

/// Parses feed bytes into entries, skipping entries without a title.
///
/// # Errors
///
/// Returns [`QuillError::FeedError`] when the document is not a recognizable
/// feed.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(bytes).map_err(|e| QuillError::FeedError(e.to_string()))?;

    Ok(feed
        .entries
        .iter()
        .filter_map(|entry| {
            let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
            if title.is_empty() {
                return None;
            }
            Some(FeedEntry { title, link: select_entry_link(entry) })
        })
        .collect())
}

/// Picks the article link of an entry.
///
/// Prefers an `alternate` (or rel-less) link, then any link, then an id
/// that looks like a URL.
fn select_entry_link(entry: &Entry) -> String {
    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return href.to_string();
        }
    }

    if let Some(link) = entry.links.iter().find(|l| !l.href.trim().is_empty()) {
        return link.href.trim().to_string();
    }

    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return id.to_string();
    }

    String::new()
}

/// Default location of the feed-list file: `<config dir>/quill/feeds.txt`.
pub fn default_feed_list_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quill").join("feeds.txt"))
}

/// Reads a feed-list file.
///
/// # Errors
///
/// Returns [`QuillError::IoError`] if the file cannot be read and
/// [`QuillError::ConfigError`] for a line that is not an http(s) URL, with
/// its line number, or for a file that lists no feed at all.
pub fn load_feed_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    let feeds = parse_feed_list(&content)?;
    if feeds.is_empty() {
        return Err(QuillError::ConfigError(format!("feed list {} contains no feed URL", path.display())));
    }
    Ok(feeds)
}

/// Parses the contents of a feed-list file.
pub fn parse_feed_list(content: &str) -> Result<Vec<String>> {
    let mut feeds = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        let url = parse_http_url(line)
            .map_err(|e| QuillError::ConfigError(format!("feed list line {}: {}", index + 1, e)))?;
        feeds.push(url.to_string());
    }

    Ok(feeds)
}

/// Cuts a `#` comment that starts the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let mut previous_is_space = true;
    for (index, c) in line.char_indices() {
        if c == '#' && previous_is_space {
            return &line[..index];
        }
        previous_is_space = c.is_whitespace();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Example</title>
            <link>https://example.com</link>
            <description>Example feed</description>
            <item>
              <title>Rust 2024 edition ships</title>
              <link>https://example.com/rust-2024</link>
            </item>
            <item>
              <title>  </title>
              <link>https://example.com/untitled</link>
            </item>
            <item>
              <title>Kernel scheduler rewrite</title>
              <link>https://example.com/scheduler</link>
            </item>
          </channel>
        </rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <title>Atom Example</title>
          <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
          <updated>2024-12-13T18:30:02Z</updated>
          <entry>
            <title>Atom entry</title>
            <link rel="self" href="https://example.com/self"/>
            <link rel="alternate" href="https://example.com/atom-entry"/>
            <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
            <updated>2024-12-13T18:30:02Z</updated>
          </entry>
        </feed>"#;

    #[test]
    fn test_parse_rss_skips_untitled() {
        let entries = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry::new("Rust 2024 edition ships", "https://example.com/rust-2024"),
                FeedEntry::new("Kernel scheduler rewrite", "https://example.com/scheduler"),
            ]
        );
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let entries = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://example.com/atom-entry");
    }

    #[test]
    fn test_parse_garbage_is_feed_error() {
        let result = parse_feed(b"<html><body>not a feed</body></html>");
        assert!(matches!(result, Err(QuillError::FeedError(_))));
    }

    #[test]
    fn test_context_line() {
        let entry = FeedEntry::new("Title", "https://example.com");
        assert_eq!(entry.to_context_line(), "- Title (Link: https://example.com)");
    }

    #[test]
    fn test_parse_feed_list() {
        let content = "# engineering feeds\nhttps://a.example/rss\n\n  https://b.example/atom  # trailing comment\n";
        let feeds = parse_feed_list(content).unwrap();
        assert_eq!(feeds, vec!["https://a.example/rss", "https://b.example/atom"]);
    }

    #[test]
    fn test_parse_feed_list_reports_line() {
        let err = parse_feed_list("https://a.example/rss\nnot-a-url\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_feed_list_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.txt");
        std::fs::write(&path, "https://example.com/feed\n").unwrap();

        let feeds = load_feed_list(&path).unwrap();
        assert_eq!(feeds, vec!["https://example.com/feed"]);
    }

    #[test]
    fn test_feed_list_keeps_url_fragments() {
        let content = "https://x.example/feed#atom\nhttps://y.example/rss#top  # mirror\n#https://off.example\n";
        let feeds = parse_feed_list(content).unwrap();
        assert_eq!(feeds, vec!["https://x.example/feed#atom", "https://y.example/rss#top"]);
    }

    #[test]
    fn test_comment_only_feed_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.txt");
        std::fs::write(&path, "# nothing enabled\n# https://a.example/rss\n\n").unwrap();

        let result = load_feed_list(&path);
        assert!(matches!(result, Err(QuillError::ConfigError(ref msg)) if msg.contains("no feed URL")));
    }

    #[test]
    fn test_load_missing_feed_list() {
        let result = load_feed_list(Path::new("/nonexistent/quill/feeds.txt"));
        assert!(matches!(result, Err(QuillError::IoError(_))));
    }
}
