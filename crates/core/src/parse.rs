//! HTML parsing for source pages.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! cover resolver to read meta tags from the article a topic came from.
//!
//! # Example
//!
//! ```rust
//! use quill_core::parse::Document;
//!
//! let html = r#"<html><head><meta property="og:image" content="/c.jpg"></head><body></body></html>"#;
//! let doc = Document::parse(html).unwrap();
//! let metas = doc.select(r#"meta[property="og:image"]"#).unwrap();
//! assert_eq!(metas.len(), 1);
//! assert_eq!(metas[0].attr("content"), Some("/c.jpg"));
//! ```

use scraper::{Html, Selector};
use url::Url;

use crate::{QuillError, Result};

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses HTML and records the URL it was fetched from.
    ///
    /// The base URL is used to resolve relative image references.
    pub fn parse_with_url(html: &str, base_url: Url) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: Some(base_url) })
    }

    /// Gets the base URL the document was fetched from, if known.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| QuillError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl Element<'_> {
    /// Gets the value of an attribute, or `None` if it is not present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}
