//! Draft cleanup.
//!
//! Generated drafts tend to open with chatter ("Sure, here is your
//! article!"), carry labels such as `Title:` and spell headings as `**H2:
//! Foo**`. Cleanup runs in two passes:
//!
//! 1. a model-mediated rewrite at temperature 0, accepted only when it keeps
//!    the signature and every placeholder marker;
//! 2. a deterministic [`RuleSet`], applied line by line outside code fences.
//!
//! The rule pass is idempotent.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::WritingConfig;
use crate::generation::{GenerationRequest, Generator};
use crate::inject::marker_count;

/// What a rule does to a matching line.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Removes the whole line.
    DropLine(Regex),
    /// Replaces matches with a template (`$1` style captures allowed).
    Rewrite { pattern: Regex, replacement: &'static str },
    /// Rewrites a loose heading annotation. The pattern must capture the
    /// heading depth as `level` and the heading text as `text`.
    Heading(Regex),
    /// Removes trailing whitespace.
    TrimEnd,
    /// Drops a blank line that follows another blank line.
    CollapseBlankLines,
}

/// A named cleanup rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(name: &'static str, kind: RuleKind) -> Self {
        Self { name, kind }
    }
}

/// Upper bound on per-line passes; a line normally settles in two.
const MAX_LINE_PASSES: usize = 8;

/// An ordered table of cleanup rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

static STANDARD: LazyLock<RuleSet> = LazyLock::new(RuleSet::standard);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The built-in rules.
    pub fn standard() -> Self {
        let heading = |pattern: &str| RuleKind::Heading(Regex::new(pattern).unwrap());

        Self::new(vec![
            Rule::new("bold-heading-annotation", heading(r"^\s*\*\*\s*[Hh](?P<level>[1-6])\s*[:.\-]?\s*(?P<text>.+?)\s*\*\*\s*$")),
            Rule::new("bold-level-prefix", heading(r"^\s*\*\*[Hh](?P<level>[1-6])\*\*\s*[:.\-]?\s*(?P<text>.+?)\s*$")),
            Rule::new("bare-heading-annotation", heading(r"^\s*[Hh](?P<level>[1-6])\s*[:.\-]\s*(?P<text>.+?)\s*$")),
            Rule::new(
                "strip-labels",
                RuleKind::Rewrite {
                    pattern: Regex::new(
                        r"(?i)^(?P<lead>\s*(?:#{1,6}\s+)?)(?:\*\*)?(?:(?:title|titre|subtitle|sous-titre|introduction|conclusion|author|auteur|summary|résumé)\s*:\s*(?:\*\*)?\s*)+",
                    )
                    .unwrap(),
                    replacement: "$lead",
                },
            ),
            Rule::new(
                "drop-filler",
                RuleKind::DropLine(
                    Regex::new(
                        r"(?i)^\s*(?:sure|certainly|of course|absolutely|here is|here are|here's|here’s|as an ai|as a language model|i hope this|let me know if|bien sûr|voici|j'espère)\b",
                    )
                    .unwrap(),
                ),
            ),
            Rule::new(
                "heading-space",
                RuleKind::Rewrite { pattern: Regex::new(r"^(?P<hashes>#{1,6})(?P<first>[^#\s])").unwrap(), replacement: "$hashes $first" },
            ),
            Rule::new("trim-trailing-whitespace", RuleKind::TrimEnd),
            Rule::new("collapse-blank-lines", RuleKind::CollapseBlankLines),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Applies the rules to every line outside code fences.
    pub fn apply(&self, text: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut fence: Option<&str> = None;

        for line in text.lines() {
            let trimmed = line.trim_start();

            if let Some(marker) = fence {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
                out.push(line.to_string());
                continue;
            }
            if let Some(marker) = fence_marker(trimmed) {
                fence = Some(marker);
                out.push(line.trim_end().to_string());
                continue;
            }

            if let Some(cleaned) = self.settle_line(line)
                && !self.drops_as_repeated_blank(&cleaned, out.last())
            {
                out.push(cleaned);
            }
        }

        let first = out.iter().position(|l| !l.is_empty()).unwrap_or(out.len());
        let last = out.iter().rposition(|l| !l.is_empty()).map_or(first, |i| i + 1);
        let mut result = out[first..last].join("\n");
        if text.ends_with('\n') && !result.is_empty() {
            result.push('\n');
        }
        result
    }

    /// Applies the line rules repeatedly until the line stops changing.
    fn settle_line(&self, line: &str) -> Option<String> {
        let mut current = line.to_string();

        for _ in 0..MAX_LINE_PASSES {
            let next = self.apply_line_rules(&current)?;
            if next == current {
                break;
            }
            current = next;
        }

        Some(current)
    }

    fn apply_line_rules(&self, line: &str) -> Option<String> {
        let mut line = line.to_string();

        for rule in &self.rules {
            match &rule.kind {
                RuleKind::DropLine(pattern) => {
                    if pattern.is_match(&line) {
                        tracing::trace!(rule = rule.name, "line dropped");
                        return None;
                    }
                }
                RuleKind::Rewrite { pattern, replacement } => {
                    line = pattern.replace(&line, *replacement).into_owned();
                }
                RuleKind::Heading(pattern) => {
                    if let Some(caps) = pattern.captures(&line) {
                        let level = caps.name("level").and_then(|m| m.as_str().parse::<usize>().ok()).unwrap_or(2);
                        let text = caps.name("text").map(|m| m.as_str().trim()).unwrap_or_default();
                        let text = text.trim_matches('*').trim();
                        if !text.is_empty() {
                            line = format!("{} {}", "#".repeat(level), text);
                        }
                    }
                }
                RuleKind::TrimEnd => {
                    line.truncate(line.trim_end().len());
                }
                RuleKind::CollapseBlankLines => {}
            }
        }

        Some(line)
    }

    fn drops_as_repeated_blank(&self, line: &str, previous: Option<&String>) -> bool {
        let collapses = self.rules.iter().any(|r| matches!(r.kind, RuleKind::CollapseBlankLines));
        collapses && line.trim().is_empty() && previous.is_some_and(|p| p.trim().is_empty())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn fence_marker(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Applies the built-in rules.
pub fn apply_rules(text: &str) -> String {
    STANDARD.apply(text)
}

fn rewrite_prompt(markdown: &str) -> String {
    format!(
        "You are a copy editor. Clean up the Markdown article below.\n\
         - Remove any conversational preamble or closing remark addressed to the reader of this message \
         (for example \"Sure, here is your article\").\n\
         - Remove labels such as \"Title:\" or \"Introduction:\".\n\
         - Fix heading markup so headings use #, ## and ###.\n\
         - Keep every line of the form ![IMG_PROMPT: ...] exactly as it is.\n\
         - Keep the final signature line exactly as it is.\n\
         - Do not change the wording of the article otherwise.\n\
         If the article is already clean, return it unchanged. Return only the article.\n\n\
         ----- ARTICLE -----\n{}",
        markdown
    )
}

fn unwrap_markdown_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let lower = trimmed.get(..12).unwrap_or(trimmed).to_ascii_lowercase();
    if lower.starts_with("```markdown") || lower.starts_with("```md") {
        crate::structured::strip_code_fence(trimmed)
    } else {
        trimmed
    }
}

/// Asks the generator for a cleaned-up copy of the draft.
///
/// Returns the original text when the call fails, comes back empty, or loses
/// the signature or any placeholder marker.
pub async fn rewrite(markdown: &str, generator: &dyn Generator, signature: &str) -> String {
    let request = GenerationRequest::new(rewrite_prompt(markdown)).temperature(0.0);

    let candidate = match generator.generate(&request).await {
        Ok(text) => unwrap_markdown_fence(&text).to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "cleanup rewrite failed, keeping draft");
            return markdown.to_string();
        }
    };

    if candidate.is_empty() {
        tracing::warn!("cleanup rewrite was empty, keeping draft");
        return markdown.to_string();
    }

    let signature = signature.trim();
    if !signature.is_empty() && markdown.contains(signature) && !candidate.contains(signature) {
        tracing::warn!("cleanup rewrite dropped the signature, keeping draft");
        return markdown.to_string();
    }

    let expected = marker_count(markdown);
    let kept = marker_count(&candidate);
    if kept < expected {
        tracing::warn!(expected, kept, "cleanup rewrite dropped placeholder markers, keeping draft");
        return markdown.to_string();
    }

    candidate
}

/// Runs both cleanup passes, or returns the draft untouched when disabled.
pub async fn normalize(markdown: &str, generator: &dyn Generator, config: &WritingConfig) -> String {
    if !config.normalize {
        tracing::debug!("normalizer disabled");
        return markdown.to_string();
    }

    let rewritten = rewrite(markdown, generator, &config.signature).await;
    apply_rules(&rewritten)
}
