//! The document submitted to the blog platform.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::image::ImageRef;
use crate::seo::{SeoMetadata, slugify};

/// A post tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
}

impl Tag {
    /// Creates a tag whose slug is derived from the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let slug = slugify(&name, 60);
        Self { name, slug }
    }
}

/// Everything needed to publish one article.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedDocument {
    pub title: String,
    pub markdown_body: String,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub cover_image: Option<ImageRef>,
    pub tags: Vec<Tag>,
}

impl PublishedDocument {
    /// Assembles the document from the finished body and its metadata.
    ///
    /// The leading `# Title` line is removed because the platform renders the
    /// title itself, and the signature is appended when the body lacks it.
    pub fn assemble(
        title: &str, body: &str, signature: &str, seo: SeoMetadata, cover_image: Option<ImageRef>, tags: Vec<Tag>,
    ) -> Self {
        let body = strip_leading_title(body);
        let markdown_body = ensure_signature(&body, signature);

        Self {
            title: title.to_string(),
            markdown_body,
            slug: seo.slug,
            meta_title: seo.meta_title,
            meta_description: seo.meta_description,
            cover_image,
            tags,
        }
    }

    /// Renders the document as front matter followed by the Markdown body.
    pub fn render(&self) -> String {
        let mut out = String::from("+++\n");
        let _ = writeln!(out, "title = {}", quoted(&self.title));
        let _ = writeln!(out, "slug = {}", quoted(&self.slug));
        let _ = writeln!(out, "meta_title = {}", quoted(&self.meta_title));
        let _ = writeln!(out, "meta_description = {}", quoted(&self.meta_description));
        if let Some(cover) = &self.cover_image {
            let _ = writeln!(out, "cover_image = {}", quoted(&cover.url));
            let _ = writeln!(out, "cover_origin = {}", quoted(cover.origin.as_str()));
        }
        let tags: Vec<String> = self.tags.iter().map(|t| quoted(&t.name)).collect();
        let _ = writeln!(out, "tags = [{}]", tags.join(", "));
        out.push_str("+++\n\n");
        out.push_str(&self.markdown_body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('"', "'")))
}

/// Removes a leading level-1 heading and the blank lines after it.
pub fn strip_leading_title(markdown: &str) -> String {
    let mut lines = markdown.lines().skip_while(|l| l.trim().is_empty()).peekable();

    match lines.peek() {
        Some(first) if is_h1(first) => {
            lines.next();
            lines.skip_while(|l| l.trim().is_empty()).collect::<Vec<_>>().join("\n")
        }
        _ => markdown.trim_start_matches(['\n', '\r']).to_string(),
    }
}

fn is_h1(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("# ") || line == "#"
}

/// Appends the signature on its own paragraph unless the body already has it.
pub fn ensure_signature(markdown: &str, signature: &str) -> String {
    let signature = signature.trim();
    if signature.is_empty() || markdown.contains(signature) {
        return markdown.to_string();
    }

    let body = markdown.trim_end();
    if body.is_empty() { signature.to_string() } else { format!("{}\n\n{}", body, signature) }
}

/// Combines configured tags with tags derived from comma-separated keywords.
///
/// Configured tags come first. Duplicates (by slug) are dropped and the result
/// holds at most `max` tags.
pub fn derive_tags(configured: &[Tag], keywords: &str, max: usize) -> Vec<Tag> {
    let mut seen = HashSet::new();
    let keyword_tags = keywords.split(',').map(str::trim).filter(|k| !k.is_empty()).map(Tag::new);

    configured
        .iter()
        .cloned()
        .chain(keyword_tags)
        .filter(|tag| !tag.slug.is_empty() && seen.insert(tag.slug.clone()))
        .take(max)
        .collect()
}
