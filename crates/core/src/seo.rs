//! Slug and meta tag computation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use crate::generation::{GenerationRequest, Generator};
use crate::structured::parse_first;

pub const MAX_SLUG_LEN: usize = 60;
pub const MAX_META_TITLE_LEN: usize = 70;
pub const MAX_META_DESCRIPTION_LEN: usize = 156;

/// Search metadata for a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeoMetadata {
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
}

impl SeoMetadata {
    /// Metadata derived from the title and body alone.
    pub fn fallback(title: &str, body: &str) -> Self {
        let slug = slugify(title, MAX_SLUG_LEN);
        Self {
            slug: if slug.is_empty() { "post".to_string() } else { slug },
            meta_title: truncate_chars(title.trim(), MAX_META_TITLE_LEN, false),
            meta_description: truncate_chars(&first_paragraph(body), MAX_META_DESCRIPTION_LEN, true),
        }
    }
}

/// Lowercase ASCII slug: accents folded, runs of anything else turned into a
/// single `-`, cut on a `-` boundary to at most `max_len` characters.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len());

    for c in text.nfkd() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c.is_ascii() && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        // Non-ASCII (combining marks and the rest) is dropped.
    }

    let slug = slug.trim_matches('-');
    if slug.len() <= max_len {
        return slug.to_string();
    }

    let head = &slug[..max_len];
    let cut = if slug.as_bytes()[max_len] == b'-' {
        head
    } else {
        head.rfind('-').map_or(head, |i| &head[..i])
    };
    cut.trim_matches('-').to_string()
}

/// Shortens text to at most `max` characters, preferring a word boundary.
///
/// With `ellipsis`, a shortened result ends in `...` (counted in `max`).
pub fn truncate_chars(text: &str, max: usize, ellipsis: bool) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }

    let budget = if ellipsis { max.saturating_sub(3) } else { max };
    let head: String = text.chars().take(budget).collect();
    let next_is_break = text.chars().nth(budget).is_some_and(char::is_whitespace);

    let cut = match head.rfind(char::is_whitespace) {
        Some(i) if !next_is_break && i > budget / 2 => &head[..i],
        _ => head.as_str(),
    };
    let cut = cut.trim_end_matches(|c: char| c.is_whitespace() || ",;:-".contains(c));

    if ellipsis { format!("{}...", cut.trim_end_matches('.')) } else { cut.to_string() }
}

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_`~]+").unwrap());

/// First paragraph of prose in a Markdown body, as plain text.
pub fn first_paragraph(markdown: &str) -> String {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if in_fence {
            continue;
        }

        let is_prose = !trimmed.is_empty()
            && !trimmed.starts_with('#')
            && !trimmed.starts_with("![")
            && !trimmed.starts_with('<')
            && !trimmed.starts_with('|')
            && !trimmed.starts_with('>');

        if is_prose {
            paragraph.push(trimmed);
        } else if !paragraph.is_empty() {
            break;
        }
    }

    let text = paragraph.join(" ");
    let text = LINK.replace_all(&text, "$1");
    let text = EMPHASIS.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Deserialize)]
struct SeoPick {
    slug: Option<String>,
    #[serde(alias = "metaTitle", alias = "title")]
    meta_title: Option<String>,
    #[serde(alias = "metaDescription", alias = "description")]
    meta_description: Option<String>,
}

fn seo_prompt(title: &str, body: &str) -> String {
    let excerpt: String = body.chars().take(1500).collect();
    format!(
        "You are an SEO specialist. For the blog post below, reply ONLY with a JSON object:\n\
         {{\"slug\": \"lowercase-words-with-hyphens (max {MAX_SLUG_LEN} chars)\", \
         \"meta_title\": \"max {MAX_META_TITLE_LEN} chars\", \
         \"meta_description\": \"max {MAX_META_DESCRIPTION_LEN} chars, one or two sentences\"}}\n\n\
         Title: {title}\n\nBeginning of the post:\n{excerpt}"
    )
}

/// Computes search metadata, falling back field by field to values derived
/// from the title and body.
pub async fn generate_seo(title: &str, body: &str, generator: &dyn Generator) -> SeoMetadata {
    let fallback = SeoMetadata::fallback(title, body);

    let request = GenerationRequest::new(seo_prompt(title, body)).structured().temperature(0.2);
    let pick = match generator.generate(&request).await {
        Ok(text) => parse_first::<SeoPick>(&text),
        Err(e) => {
            tracing::warn!(error = %e, "SEO call failed, using derived metadata");
            return fallback;
        }
    };
    let Some(pick) = pick else {
        tracing::warn!("SEO call returned no usable object, using derived metadata");
        return fallback;
    };

    let slug = pick.slug.map(|s| slugify(&s, MAX_SLUG_LEN)).filter(|s| !s.is_empty());
    let meta_title = pick
        .meta_title
        .map(|t| truncate_chars(&t, MAX_META_TITLE_LEN, false))
        .filter(|t| !t.is_empty());
    let meta_description = pick
        .meta_description
        .map(|d| truncate_chars(&d, MAX_META_DESCRIPTION_LEN, true))
        .filter(|d| !d.is_empty());

    SeoMetadata {
        slug: slug.unwrap_or(fallback.slug),
        meta_title: meta_title.unwrap_or(fallback.meta_title),
        meta_description: meta_description.unwrap_or(fallback.meta_description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QuillError, Result};
    use async_trait::async_trait;
    use rstest::rstest;

    #[rstest]
    #[case("Hello, World!", "hello-world")]
    #[case("  Déjà vu: Café Résumé  ", "deja-vu-cafe-resume")]
    #[case("Rust 2024 -- async/await", "rust-2024-async-await")]
    #[case("日本語", "")]
    #[case("C++ & Go", "c-go")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input, MAX_SLUG_LEN), expected);
    }

    #[test]
    fn test_slugify_cuts_on_hyphen() {
        let title = "Designing for Failure: Practical Resilience Patterns in Modern Software Systems";
        let slug = slugify(title, 60);
        assert!(slug.len() <= 60);
        assert_eq!(slug, "designing-for-failure-practical-resilience-patterns-in");
        assert_eq!(slugify("abcdefghij", 4), "abcd");
        assert_eq!(slugify("abc-defgh", 3), "abc");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10, true), "short");
        assert_eq!(truncate_chars("one two three four", 12, false), "one two");
        let long = "word ".repeat(60);
        let out = truncate_chars(&long, 156, true);
        assert!(out.chars().count() <= 156);
        assert!(out.ends_with("word..."));
    }

    #[test]
    fn test_first_paragraph() {
        let body = "## Intro\n\n![x](y)\n\nCaches **matter**. See [the docs](https://d.test)\nfor `more`.\n\nSecond.";
        assert_eq!(first_paragraph(body), "Caches matter. See the docs for more.");
        assert_eq!(first_paragraph("```\ncode\n```\nAfter code."), "After code.");
    }

    #[test]
    fn test_fallback() {
        let seo = SeoMetadata::fallback(&"A".repeat(80), "Body text.");
        assert_eq!(seo.meta_title.len(), 70);
        assert_eq!(seo.meta_description, "Body text.");
        assert_eq!(SeoMetadata::fallback("日本語", "").slug, "post");
    }

    struct Reply(&'static str);

    #[async_trait]
    impl Generator for Reply {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            assert!(request.structured);
            if self.0 == "fail" {
                return Err(QuillError::GenerationError("down".to_string()));
            }
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_seo_sanitizes_fields() {
        let reply = r#"{"slug": "Caching At Scale!!", "meta_title": "  Caching  ", "meta_description": ""}"#;
        let seo = generate_seo("Caching at scale", "First paragraph.", &Reply(reply)).await;
        assert_eq!(seo.slug, "caching-at-scale");
        assert_eq!(seo.meta_title, "Caching");
        assert_eq!(seo.meta_description, "First paragraph.");
    }

    #[rstest]
    #[case::failure("fail")]
    #[case::empty_list("[]")]
    #[case::prose("I cannot do that.")]
    #[tokio::test]
    async fn test_generate_seo_fallback(#[case] reply: &'static str) {
        let seo = generate_seo("Caching at scale", "First paragraph.", &Reply(reply)).await;
        assert_eq!(seo, SeoMetadata::fallback("Caching at scale", "First paragraph."));
    }
}
