//! Article drafting.

use crate::config::WritingConfig;
use crate::generation::{GenerationRequest, Generator};
use crate::topic::Topic;
use crate::{QuillError, Result};

/// Builds the drafting prompt and its structural contract.
pub fn article_prompt(topic: &Topic, config: &WritingConfig) -> String {
    let source = if topic.has_source() { topic.source_link.as_str() } else { "(none)" };

    format!(
        "Write a technical blog article (at least {min_words} words) in {language} about:\n\
         Title: {title}\n\
         Summary: {summary}\n\
         Keywords: {keywords}\n\
         Source: {source}\n\n\
         Requirements:\n\
         1. Expert but approachable tone.\n\
         2. Start with the title as a single `# ` heading, followed by an introduction.\n\
         3. Several technical sections using `## ` headings (and `### ` where useful), with lists and code \
         blocks where they help.\n\
         4. End with a conclusion section.\n\
         5. Include exactly {count} image placeholders, each on its own line, written exactly like this: \
         ![IMG_PROMPT: short visual description in English]\n\
         6. Finish with this signature line, verbatim: {signature}\n\
         7. Output only the Markdown article: no preamble, no closing remarks.",
        min_words = config.min_words,
        language = config.language,
        title = topic.title,
        summary = topic.summary,
        keywords = topic.keywords,
        source = source,
        count = config.placeholder_count.max(2),
        signature = config.signature,
    )
}

/// Drafts the article body.
///
/// # Errors
///
/// Fails when the generation call fails or returns only whitespace; the run
/// cannot continue without a draft.
pub async fn write_article(topic: &Topic, generator: &dyn Generator, config: &WritingConfig) -> Result<String> {
    let request = GenerationRequest::new(article_prompt(topic, config));
    let draft = generator.generate(&request).await?;

    if draft.trim().is_empty() {
        return Err(QuillError::GenerationError("article draft was empty".to_string()));
    }

    tracing::info!(words = draft.split_whitespace().count(), "article drafted");
    Ok(draft)
}
