//! Inline illustration injection.
//!
//! Drafts request images through placeholder markers of the form
//! `![IMG_PROMPT: description]`. Each marker becomes a synthesized image with
//! an italic caption. Drafts without markers get images after their first
//! headings instead, skipping the leading title.

use std::sync::LazyLock;

use regex::Regex;

use crate::image::{ImageHost, ImageRef, synthesize, themed_prompt};

/// Loose spellings of a marker: optional `!`, `[`/`{`/`((` delimiters, any
/// case, `IMG_PROMPT`/`IMG PROMPT`/`IMG-PROMPT`, `:` or `-` separator.
static LOOSE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)!?(?:\[|\{|\(\()\s*IMG[\s_\-]*PROMPT\s*[:\-–]\s*(?P<desc>[^\]\}\)\n]+?)\s*(?:\]|\}|\)\))").unwrap()
});

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[IMG_PROMPT: (?P<desc>[^\]\n]+)\]").unwrap());

/// An ATX heading of any level. A closing `#` run counts only after whitespace.
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}\s+(?P<text>.+?)(?:\s+#+)?\s*$").unwrap());

/// The injected body and the images it now embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Injected {
    pub markdown: String,
    pub images: Vec<ImageRef>,
}

/// Rewrites every loose marker spelling to `![IMG_PROMPT: description]`.
pub fn canonicalize_markers(text: &str) -> String {
    LOOSE_MARKER.replace_all(text, "![IMG_PROMPT: $desc]").into_owned()
}

/// Counts placeholder markers, including loosely spelled ones.
pub fn marker_count(text: &str) -> usize {
    MARKER.find_iter(&canonicalize_markers(text)).count()
}

/// Markdown for an embedded image followed by its caption.
pub fn image_block(description: &str, url: &str) -> String {
    let description = description.trim();
    let caption = description.replace('*', "");
    format!("![{}]({})\n\n*{}*", description, url, caption.trim())
}

/// Replaces markers with synthesized images, or falls back to images after
/// headings when the draft has no markers.
pub async fn inject_images(
    markdown: &str, topic_title: &str, host: &dyn ImageHost, theme: &str, max_fallback_images: usize,
) -> Injected {
    let canonical = canonicalize_markers(markdown);

    if MARKER.is_match(&canonical) {
        replace_markers(&canonical, host, theme).await
    } else {
        tracing::warn!("draft has no image placeholders, placing images after headings");
        inject_after_headings(&canonical, topic_title, host, theme, max_fallback_images).await
    }
}

async fn replace_markers(text: &str, host: &dyn ImageHost, theme: &str) -> Injected {
    let mut out = String::with_capacity(text.len());
    let mut images = Vec::new();
    let mut last = 0;

    for caps in MARKER.captures_iter(text) {
        let (Some(whole), Some(desc)) = (caps.get(0), caps.name("desc")) else {
            continue;
        };
        let description = desc.as_str().trim();
        let image = synthesize(host, &themed_prompt(description, theme), false).await;

        out.push_str(&text[last..whole.start()]);
        out.push_str(&image_block(description, &image.url));
        last = whole.end();
        images.push(image);
    }
    out.push_str(&text[last..]);

    tracing::info!(images = images.len(), "placeholders replaced");
    Injected { markdown: out, images }
}

async fn inject_after_headings(
    text: &str, topic_title: &str, host: &dyn ImageHost, theme: &str, max_images: usize,
) -> Injected {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + max_images * 4);
    let mut images = Vec::new();
    let mut in_fence = false;
    let title_line = leading_title_index(&lines);

    for (index, line) in lines.iter().enumerate() {
        out.push(line.to_string());
        if Some(index) == title_line {
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || images.len() >= max_images {
            continue;
        }

        let Some(heading) = HEADING.captures(line).and_then(|c| c.name("text")) else {
            continue;
        };
        let heading = heading.as_str().trim();
        let prompt = themed_prompt(&format!("{}, illustrating {}", heading, topic_title), theme);
        let image = synthesize(host, &prompt, false).await;

        out.push(String::new());
        out.push(image_block(heading, &image.url));
        if lines.get(index + 1).is_some_and(|next| !next.trim().is_empty()) {
            out.push(String::new());
        }
        images.push(image);
    }

    let mut markdown = out.join("\n");
    if text.ends_with('\n') {
        markdown.push('\n');
    }

    tracing::info!(images = images.len(), "images placed after headings");
    Injected { markdown, images }
}

/// Index of the title line: the first non-blank line, when it is a `# ` heading.
fn leading_title_index(lines: &[&str]) -> Option<usize> {
    let (index, first) = lines.iter().enumerate().find(|(_, l)| !l.trim().is_empty())?;
    let first = first.trim_start();
    (first.starts_with("# ") || first == "#").then_some(index)
}
