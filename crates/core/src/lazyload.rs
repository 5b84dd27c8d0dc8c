//! Lazy-loaded image resolution.
//!
//! Rich-text bodies often encode an image twice: a `<noscript>` fallback
//! holding the real `<img>`, followed by a placeholder `<img>` that a script
//! would normally swap in. Without script execution the placeholder stays
//! blank, so this pass copies the real source onto the placeholder and drops
//! the fallback block.
//!
//! Sibling relationships matter here, so the pass works on a parsed tree
//! rather than on the markup text.

use std::sync::LazyLock;

use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};

static NOSCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("noscript").expect("valid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));

/// Resolves every `<noscript>` fallback in `markup`.
///
/// For each block, the `src` of its nested `<img>` is copied onto the
/// nearest following sibling `<img>`, replacing its `src` or adding one when
/// the placeholder has none. The block is then removed. Blocks without an
/// image are removed and nothing else changes. Markup without
/// any `<noscript>` comes back unchanged.
///
/// # Example
///
/// ```rust
/// use offprint_core::lazyload::resolve_lazy_images;
///
/// let html = r#"<noscript><img src="real.jpg"></noscript><img src="blank.svg">"#;
/// assert_eq!(resolve_lazy_images(html), r#"<img src="real.jpg">"#);
/// ```
pub fn resolve_lazy_images(markup: &str) -> String {
    let mut fragment = Html::parse_fragment(markup);

    let blocks: Vec<_> = fragment
        .select(&NOSCRIPT)
        .map(|block| {
            let target = placeholder_for(block).map(|(img, fallback)| (img.id(), fallback));
            (block.id(), target)
        })
        .collect();

    if blocks.is_empty() {
        return markup.to_string();
    }

    tracing::debug!(count = blocks.len(), "resolving lazy-load fallbacks");

    for (block, target) in blocks {
        if let Some((img, fallback)) = target
            && let Some(mut node) = fragment.tree.get_mut(img)
            && let Node::Element(element) = node.value()
        {
            copy_source(&fallback, element);
        }

        if let Some(mut node) = fragment.tree.get_mut(block) {
            node.detach();
        }
    }

    fragment.root_element().inner_html()
}

/// Finds the placeholder image following `block` and the real image it should show.
fn placeholder_for(block: ElementRef<'_>) -> Option<(ElementRef<'_>, Element)> {
    let fallback = fallback_image(block)?;
    let placeholder = block
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "img")?;

    Some((placeholder, fallback))
}

/// The real `<img>` inside a fallback block, if it has a `src`.
///
/// With scripting enabled, HTML5 parsing keeps `<noscript>` content as raw
/// text, so the text is parsed again when no `<img>` element is found.
fn fallback_image(block: ElementRef<'_>) -> Option<Element> {
    if let Some(img) = block.select(&IMG).next() {
        return img.value().attr("src").map(|_| img.value().clone());
    }

    let raw: String = block.text().collect();
    if !raw.contains('<') {
        return None;
    }

    let inner = Html::parse_fragment(&raw);
    let img = inner.select(&IMG).next()?;
    img.value().attr("src").map(|_| img.value().clone())
}

/// Sets the `src` of `placeholder` to the one on `fallback`, adding the
/// attribute when the placeholder lacks it.
fn copy_source(fallback: &Element, placeholder: &mut Element) {
    let Some((name, value)) = fallback
        .attrs
        .iter()
        .find(|(name, _)| &*name.local == "src")
        .map(|(name, value)| (name.clone(), value.clone()))
    else {
        return;
    };

    if let Some((_, current)) = placeholder.attrs.iter_mut().find(|(existing, _)| existing.local == name.local) {
        *current = value;
        return;
    }

    placeholder.attrs.extend(std::iter::once((name, value)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_replaces_placeholder() {
        let html = r#"<noscript><img src="https://pic.example.com/real.jpg"></noscript><img src="data:blank">"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<img src="https://pic.example.com/real.jpg">"#);
    }

    #[test]
    fn test_fallback_inside_figure() {
        let html = r#"<p>Intro</p><figure><noscript><img src="real.png"></noscript><img src="blank.svg"><figcaption>Cap</figcaption></figure>"#;
        let result = resolve_lazy_images(html);

        assert_eq!(
            result,
            r#"<p>Intro</p><figure><img src="real.png"><figcaption>Cap</figcaption></figure>"#
        );
    }

    #[test]
    fn test_nearest_following_sibling_image() {
        let html = r#"<noscript><img src="r.png"></noscript><span>x</span><img src="p1.png"><img src="p2.png">"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<span>x</span><img src="r.png"><img src="p2.png">"#);
    }

    #[test]
    fn test_placeholder_without_src_gains_one() {
        let html = r#"<noscript><img src="https://x/r.png"></noscript><img data-actualsrc="https://x/r.png" class="lazy">"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<img class="lazy" data-actualsrc="https://x/r.png" src="https://x/r.png">"#);
    }

    #[test]
    fn test_fallback_image_carries_source() {
        let html = r#"<noscript><img src="real.jpg"></noscript><img class="lazy">"#;
        let fragment = Html::parse_fragment(html);
        let block = fragment.select(&NOSCRIPT).next().unwrap();
        let (_, fallback) = placeholder_for(block).unwrap();

        assert_eq!(fallback.attr("src"), Some("real.jpg"));
        assert_eq!(resolve_lazy_images(html), r#"<img class="lazy" src="real.jpg">"#);
    }

    #[test]
    fn test_non_sibling_image_untouched() {
        let html = r#"<noscript><img src="r.png"></noscript><div><img src="p.png"></div>"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<div><img src="p.png"></div>"#);
    }

    #[test]
    fn test_preceding_image_untouched() {
        let html = r#"<img src="before.png"><noscript><img src="r.png"></noscript>"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<img src="before.png">"#);
    }

    #[test]
    fn test_block_without_image_is_removed() {
        let html = r#"<noscript>Enable JavaScript</noscript><img src="keep.png">"#;
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<img src="keep.png">"#);
    }

    #[test]
    fn test_multiple_blocks() {
        let html = concat!(
            r#"<noscript><img src="a.jpg"></noscript><img src="blank">"#,
            r#"<p>between</p>"#,
            r#"<noscript><img src="b.jpg"></noscript><img src="blank">"#,
        );
        let result = resolve_lazy_images(html);

        assert_eq!(result, r#"<img src="a.jpg"><p>between</p><img src="b.jpg">"#);
        assert!(!result.contains("noscript"));
    }

    #[test]
    fn test_no_noscript_is_byte_identical() {
        let html = "<P CLASS=x>Unclosed <b>markup\n  <img src='a.png'>";
        assert_eq!(resolve_lazy_images(html), html);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(resolve_lazy_images(""), "");
    }
}
