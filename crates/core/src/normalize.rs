//! Body markup normalization.
//!
//! Three passes turn API markup into something that renders offline under a
//! page whose title is the only `<h1>`:
//!
//! 1. lazy-load fallbacks are resolved ([`resolve_lazy_images`]);
//! 2. remote `<img src>` references are localized through the [`AssetCache`];
//! 3. headings are demoted one level when the body uses `<h1>`.
//!
//! Passes 2 and 3 use a streaming rewriter, so markup they do not touch is
//! emitted exactly as it came in.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::assets::{AssetCache, AssetPolicy};
use crate::lazyload::resolve_lazy_images;
use crate::{OffprintError, Result};

static REMOTE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^https?://[^\s"'<>]+\.(?:jpe?g|png|gif|webp|bmp|svg)(?:[?#][^\s"'<>]*)?$"#)
        .expect("valid regex")
});
static IMG_WITH_SRC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

/// Whether `src` is a remote image reference the cache should localize.
///
/// Only `http`/`https` URLs ending in a known image extension match; local
/// paths never do, which keeps the rewrite idempotent.
pub fn is_remote_image(src: &str) -> bool {
    REMOTE_IMAGE.is_match(src.trim())
}

/// Remote image sources in `markup`, deduplicated, in document order.
pub fn remote_image_sources(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    let mut sources: Vec<String> = Vec::new();

    for img in fragment.select(&IMG_WITH_SRC) {
        if let Some(src) = img.value().attr("src").map(str::trim)
            && is_remote_image(src)
            && !sources.iter().any(|seen| seen == src)
        {
            sources.push(src.to_string());
        }
    }

    sources
}

/// Replaces `<img src>` values found in `replacements` with their mapped value.
pub fn rewrite_image_sources(markup: &str, replacements: &HashMap<String, String>) -> Result<String> {
    if replacements.is_empty() {
        return Ok(markup.to_string());
    }

    let mut output = Vec::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("img[src]", |el| {
                if let Some(src) = el.get_attribute("src")
                    && let Some(local) = replacements.get(decode_entities(src.trim()).as_str())
                {
                    el.set_attribute("src", local)?;
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(markup.as_bytes())
        .map_err(|e| OffprintError::HtmlRewrite(e.to_string()))?;
    rewriter.end().map_err(|e| OffprintError::HtmlRewrite(e.to_string()))?;

    String::from_utf8(output).map_err(|e| OffprintError::HtmlRewrite(e.to_string()))
}

/// Downloads every remote image in `markup` and points it at the local copy.
///
/// Downloads run concurrently through the cache. A failed image is handled
/// by `policy`: degraded to an empty `src`, or returned as an error.
pub async fn localize_images(markup: &str, cache: &AssetCache, policy: AssetPolicy) -> Result<String> {
    let sources = remote_image_sources(markup);
    if sources.is_empty() {
        return Ok(markup.to_string());
    }

    let outcomes = cache.resolve_many(&sources).await;
    let mut replacements = HashMap::with_capacity(sources.len());
    for (src, outcome) in sources.into_iter().zip(outcomes) {
        let local = policy.settle(&src, outcome)?;
        replacements.insert(src, local);
    }

    rewrite_image_sources(markup, &replacements)
}

/// Whether `markup` contains an `<h1>` element.
pub fn has_top_level_heading(markup: &str) -> bool {
    if !markup.to_ascii_lowercase().contains("<h1") {
        return false;
    }

    Html::parse_fragment(markup).select(&H1).next().is_some()
}

/// Demotes headings one level when the body contains an `<h1>`.
///
/// `h1`..`h5` become `h2`..`h6`; `h6` stays. Markup without an `<h1>` is
/// returned byte for byte.
///
/// # Example
///
/// ```rust
/// use offprint_core::normalize::demote_headings;
///
/// assert_eq!(demote_headings("<h1>A</h1><h2>B</h2>").unwrap(), "<h2>A</h2><h3>B</h3>");
/// assert_eq!(demote_headings("<h2>B</h2>").unwrap(), "<h2>B</h2>");
/// ```
pub fn demote_headings(markup: &str) -> Result<String> {
    if !has_top_level_heading(markup) {
        return Ok(markup.to_string());
    }

    let mut output = Vec::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                if let Some(lower) = demoted(&el.tag_name()) {
                    el.set_tag_name(lower)?;
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(markup.as_bytes())
        .map_err(|e| OffprintError::HtmlRewrite(e.to_string()))?;
    rewriter.end().map_err(|e| OffprintError::HtmlRewrite(e.to_string()))?;

    String::from_utf8(output).map_err(|e| OffprintError::HtmlRewrite(e.to_string()))
}

fn demoted(tag: &str) -> Option<&'static str> {
    match tag {
        "h1" => Some("h2"),
        "h2" => Some("h3"),
        "h3" => Some("h4"),
        "h4" => Some("h5"),
        "h5" => Some("h6"),
        _ => None,
    }
}

/// Decodes the entities a serializer may leave in an attribute value.
fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Runs all normalization passes over a body: lazy-load resolution, image
/// localization, then heading demotion.
pub async fn normalize_body(markup: &str, cache: &AssetCache, policy: AssetPolicy) -> Result<String> {
    let resolved = resolve_lazy_images(markup);
    let localized = localize_images(&resolved, cache, policy).await?;
    demote_headings(&localized)
}
