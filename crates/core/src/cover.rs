//! Cover image resolution.
//!
//! The cover is first sought on the source article itself (its Open Graph or
//! Twitter card image), subject to a relevance check by the generator. When
//! that yields nothing, an illustration is synthesized from the topic title
//! and, when enabled, judged once by the generator before it is accepted.

use rand::seq::SliceRandom;

use crate::config::ImageConfig;
use crate::fetch::{PageFetcher, parse_http_url};
use crate::generation::{GenerationRequest, Generator};
use crate::image::{ImageHost, ImageRef, synthesize, themed_prompt};
use crate::metadata::extract_cover_image;
use crate::topic::Topic;

/// Resolves the cover for `topic`. Always yields an image.
pub async fn resolve_cover(
    topic: &Topic, fetcher: &dyn PageFetcher, generator: &dyn Generator, host: &dyn ImageHost, config: &ImageConfig,
) -> ImageRef {
    if let Some(image) = source_cover(topic, fetcher, generator).await {
        tracing::info!(url = %image.url, "reusing source image as cover");
        return image;
    }

    synthesize_cover(topic, generator, host, config).await
}

/// Looks for an approved preview image on the topic's source page.
pub async fn source_cover(topic: &Topic, fetcher: &dyn PageFetcher, generator: &dyn Generator) -> Option<ImageRef> {
    if !topic.has_source() {
        return None;
    }
    let page_url = match parse_http_url(&topic.source_link) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(link = %topic.source_link, error = %e, "source link is not fetchable");
            return None;
        }
    };

    let html = match fetcher.fetch(page_url.as_str()).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(url = %page_url, error = %e, "could not fetch source page");
            return None;
        }
    };

    let candidate = extract_cover_image(&html, Some(&page_url))?;
    tracing::debug!(candidate = %candidate, "source page declares a preview image");

    let request = GenerationRequest::new(relevance_prompt(topic)).temperature(0.0).with_image(&candidate);
    match generator.generate(&request).await {
        Ok(answer) if is_keep(&answer) => Some(ImageRef::sourced(candidate)),
        Ok(answer) => {
            tracing::info!(answer = %answer.trim(), "source image rejected");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "relevance check failed");
            None
        }
    }
}

fn relevance_prompt(topic: &Topic) -> String {
    format!(
        "You are the photo editor of an engineering blog. The attached image is the preview image of the source \
         article for a post titled '{}'.\nSummary: {}\n\nIs it relevant to the subject and good enough to be the \
         post's cover (sharp, not a logo, not a generic placeholder)? Answer with a single word: KEEP or REPLACE.",
        topic.title, topic.summary
    )
}

/// Reads a relevance answer: contains "keep" and not "replace", in any case.
pub fn is_keep(answer: &str) -> bool {
    let answer = answer.to_lowercase();
    answer.contains("keep") && !answer.contains("replace")
}

/// Synthesizes a cover from the topic title and waits for it to render.
pub async fn synthesize_cover(
    topic: &Topic, generator: &dyn Generator, host: &dyn ImageHost, config: &ImageConfig,
) -> ImageRef {
    let subject = format!("Editorial illustration for '{}'", topic.title);
    let house_theme = config.style_profiles.first().map(String::as_str).unwrap_or_default();

    let prompt = if config.art_direction {
        match art_direct(&subject, generator, &config.style_profiles).await {
            Some(refined) => refined,
            None => themed_prompt(&subject, house_theme),
        }
    } else {
        themed_prompt(&subject, house_theme)
    };

    let cover = synthesize(host, &prompt, true).await;
    if !config.cover_review {
        return cover;
    }

    match review_cover(&cover, &topic.title, generator).await {
        Some(false) => {
            tracing::info!(url = %cover.url, "synthesized cover rejected, rendering once more");
            synthesize(host, &prompt, true).await
        }
        _ => cover,
    }
}

/// Asks the generator to judge a rendered cover.
///
/// `Some(true)` accepts, `Some(false)` rejects, `None` means no verdict.
pub async fn review_cover(cover: &ImageRef, title: &str, generator: &dyn Generator) -> Option<bool> {
    let prompt = format!(
        "You are an art critic. The attached image is the cover illustration of a post titled '{}'. Is it \
         professional and free of defects (garbled lettering, distorted shapes, artifacts)? Answer with a single \
         word: ACCEPT or REJECT.",
        title
    );
    let request = GenerationRequest::new(prompt).temperature(0.0).with_image(&cover.url);

    match generator.generate(&request).await {
        Ok(answer) => Some(!is_reject(&answer)),
        Err(e) => {
            tracing::warn!(error = %e, "cover review failed, keeping the first render");
            None
        }
    }
}

/// Reads a review answer: a rejection is any answer mentioning "reject".
pub fn is_reject(answer: &str) -> bool {
    answer.to_lowercase().contains("reject")
}

/// Turns a subject into a detailed visual prompt in a randomly chosen style.
///
/// Returns `None` when the call fails or yields nothing usable.
pub async fn art_direct(subject: &str, generator: &dyn Generator, styles: &[String]) -> Option<String> {
    let style = styles.choose(&mut rand::thread_rng()).cloned().unwrap_or_default();

    let prompt = format!(
        "You are an art director. Turn the subject below into one detailed prompt for a text-to-image model, in \
         English, describing composition, lighting and palette. The image must contain no text or lettering.\n\
         Visual style: {}\nSubject: {}\n\nReply with the prompt only.",
        style, subject
    );

    match generator.generate(&GenerationRequest::new(prompt)).await {
        Ok(text) => {
            let refined = clean_refined_prompt(&text);
            if refined.is_empty() {
                tracing::warn!("art direction returned an empty prompt");
                None
            } else {
                Some(refined)
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "art direction failed, using plain prompt");
            None
        }
    }
}

fn clean_refined_prompt(text: &str) -> String {
    let text = crate::structured::strip_code_fence(text.trim());
    let text = text.strip_prefix("Prompt:").unwrap_or(text);
    text.split_whitespace().collect::<Vec<_>>().join(" ").trim_matches(['"', '\'', '`']).trim().to_string()
}
