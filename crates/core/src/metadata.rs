//! Preview image discovery from page meta tags.

use url::Url;

use crate::Document;

/// Meta tags consulted for a cover candidate, in priority order.
const IMAGE_META_KEYS: &[&str] = &["og:image", "og:image:secure_url", "twitter:image", "twitter:image:src"];

impl Document {
    /// Extract the page's preview image with priority fallback:
    /// 1. Open Graph `og:image`
    /// 2. Open Graph `og:image:secure_url`
    /// 3. Twitter `twitter:image`
    /// 4. Twitter `twitter:image:src`
    ///
    /// Relative values are resolved against the document's base URL. Values
    /// that do not resolve to an http(s) URL are skipped.
    pub fn extract_image(&self) -> Option<String> {
        IMAGE_META_KEYS
            .iter()
            .filter_map(|key| self.get_meta_content(key))
            .find_map(|content| self.resolve_http(&content))
    }

    /// Get meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        let selector = format!("meta[name=\"{}\"]", attr);
        if let Ok(elements) = self.select(&selector)
            && let Some(el) = elements.first()
            && let Some(content) = el.attr("content")
            && !content.trim().is_empty()
        {
            return Some(content.trim().to_string());
        }

        let selector = format!("meta[property=\"{}\"]", attr);
        if let Ok(elements) = self.select(&selector)
            && let Some(el) = elements.first()
            && let Some(content) = el.attr("content")
            && !content.trim().is_empty()
        {
            return Some(content.trim().to_string());
        }

        None
    }

    fn resolve_http(&self, value: &str) -> Option<String> {
        let url = match Url::parse(value) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url()?.join(value).ok()?,
            Err(_) => return None,
        };

        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }
}

/// Returns the first preview image declared by the page, if any.
pub fn extract_cover_image(html: &str, page_url: Option<&Url>) -> Option<String> {
    let doc = match page_url {
        Some(url) => Document::parse_with_url(html, url.clone()).ok()?,
        None => Document::parse(html).ok()?,
    };
    doc.extract_image()
}
