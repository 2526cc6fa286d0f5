//! Error types for Quill operations.
//!
//! This module defines the main error type [`QuillError`], which covers every
//! failure a pipeline run can surface: HTTP transport problems, generation
//! service failures, publish rejections and configuration mistakes.
//!
//! Most stages never return these errors to the caller. Recoverable problems
//! (a dead feed, malformed structured output, a missing cover) are logged and
//! replaced with a fallback value inside the stage. Only the errors that end a
//! run travel up to the binary.
//!
//! # Example
//!
//! ```rust
//! use quill_core::{QuillError, Result};
//!
//! fn require_key(key: Option<&str>) -> Result<&str> {
//!     key.ok_or_else(|| QuillError::ConfigError("missing API key".to_string()))
//! }
//! ```

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum QuillError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, connection resets and
    /// non-success statuses surfaced through `error_for_status`.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// A feed could not be parsed as RSS or Atom.
    #[error("Feed error: {0}")]
    FeedError(String),

    /// The generation service failed or returned an unusable response.
    ///
    /// Fatal for the article-writing stage; every other call site converts
    /// it into a fallback value.
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// The publish endpoint rejected the document.
    ///
    /// `errors` holds the messages reported by the GraphQL endpoint.
    #[error("Publish failed: {}", errors.join("; "))]
    PublishError { errors: Vec<String> },

    /// Configuration errors such as missing credentials.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// File read or write errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl QuillError {
    /// Builds a publish error from a single message.
    pub fn publish(message: impl Into<String>) -> Self {
        QuillError::PublishError { errors: vec![message.into()] }
    }
}

/// Result type alias for QuillError.
pub type Result<T> = std::result::Result<T, QuillError>;
