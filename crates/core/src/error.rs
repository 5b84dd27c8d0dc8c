//! Error types for Offprint operations.
//!
//! This module defines the main error type [`OffprintError`] which represents
//! every failure the pipeline can surface: fetching payloads, decoding them,
//! localizing image assets, and the assembly step wrapping all of these.
//!
//! # Example
//!
//! ```rust
//! use offprint_core::{OffprintError, Result};
//!
//! fn require_title(title: Option<&str>) -> Result<String> {
//!     title
//!         .map(str::to_string)
//!         .ok_or_else(|| OffprintError::MissingField { field: "title".to_string() })
//! }
//! # assert!(require_title(None).is_err());
//! ```

use std::fmt;

use thiserror::Error;

/// Pipeline step at which an assembly failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStep {
    /// Fetching and decoding article metadata.
    Metadata,
    /// Fetching and decoding the article body payload.
    Content,
    /// Localizing the title image and author avatar.
    Assets,
    /// Running the markup normalizer over the body.
    Normalize,
    /// Fetching and decoding the comment thread.
    Comments,
}

impl fmt::Display for AssemblyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssemblyStep::Metadata => "metadata",
            AssemblyStep::Content => "content",
            AssemblyStep::Assets => "assets",
            AssemblyStep::Normalize => "normalize",
            AssemblyStep::Comments => "comments",
        };
        f.write_str(name)
    }
}

/// Main error type for fetching, normalizing and assembling articles.
///
/// Variants fall into four families:
///
/// * fetch failures: [`Http`](OffprintError::Http), [`Timeout`](OffprintError::Timeout),
///   [`InvalidUrl`](OffprintError::InvalidUrl), [`Status`](OffprintError::Status)
/// * parse failures: [`MissingField`](OffprintError::MissingField),
///   [`MalformedPayload`](OffprintError::MalformedPayload),
///   [`InvalidTimestamp`](OffprintError::InvalidTimestamp),
///   [`HtmlRewrite`](OffprintError::HtmlRewrite)
/// * asset failures: [`Asset`](OffprintError::Asset)
/// * assembly failures: [`Assembly`](OffprintError::Assembly), wrapping any of the above
///
/// # Example
///
/// ```rust
/// use offprint_core::{AssemblyStep, OffprintError};
///
/// let err = OffprintError::Assembly {
///     step: AssemblyStep::Content,
///     source: Box::new(OffprintError::MissingField { field: "content".to_string() }),
/// };
/// assert!(err.to_string().contains("content"));
/// assert_eq!(err.step(), Some(AssemblyStep::Content));
/// ```
#[derive(Error, Debug)]
pub enum OffprintError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps DNS failures, refused connections and other transport problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a non-success status code.
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// A payload lacks a field the pipeline cannot do without.
    #[error("Payload is missing required field `{field}`")]
    MissingField { field: String },

    /// A payload could not be decoded (not JSON, or a field has the wrong type).
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A timestamp was neither RFC 3339 nor Unix seconds.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The streaming HTML rewriter rejected the markup.
    #[error("Failed to rewrite HTML: {0}")]
    HtmlRewrite(String),

    /// An image could not be downloaded or stored.
    #[error("Failed to localize asset {url}: {source}")]
    Asset {
        url: String,
        #[source]
        source: Box<OffprintError>,
    },

    /// A mandatory pipeline step failed.
    #[error("Assembly failed at {step} step: {source}")]
    Assembly {
        step: AssemblyStep,
        #[source]
        source: Box<OffprintError>,
    },

    /// Local storage errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A renderer could not produce output.
    #[error("Failed to render document: {0}")]
    Render(String),
}

impl OffprintError {
    /// Wraps `self` as an assembly failure at `step`.
    pub fn at(self, step: AssemblyStep) -> Self {
        OffprintError::Assembly { step, source: Box::new(self) }
    }

    /// Wraps `self` as an asset failure for `url`.
    pub fn for_asset(self, url: &str) -> Self {
        OffprintError::Asset { url: url.to_string(), source: Box::new(self) }
    }

    /// Returns the failing step when this is an assembly failure.
    pub fn step(&self) -> Option<AssemblyStep> {
        match self {
            OffprintError::Assembly { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OffprintError {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        match missing_field_name(&message) {
            Some(field) => OffprintError::MissingField { field },
            None => OffprintError::MalformedPayload(message),
        }
    }
}

/// Pulls the field name out of serde's "missing field `name`" message.
fn missing_field_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// Result type alias for OffprintError.
///
/// This is a convenience alias for `std::result::Result<T, OffprintError>`.
pub type Result<T> = std::result::Result<T, OffprintError>;
