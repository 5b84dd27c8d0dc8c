//! Standalone HTML page renderer.

use std::fmt::Write as _;

use super::{Renderer, escape_html};
use crate::Result;
use crate::document::{Comment, Document};

const STYLE: &str = "body{max-width:720px;margin:2em auto;padding:0 1em;font-family:sans-serif;line-height:1.7}\
img{max-width:100%}\
.title-image{width:100%}\
.byline,.comment-meta{color:#666;font-size:.9em}\
.avatar{width:24px;height:24px;border-radius:50%;vertical-align:middle;margin-right:.4em}\
.topics{list-style:none;padding:0}.topics li{display:inline-block;margin-right:.5em;padding:0 .5em;background:#eef}\
.comment{border-top:1px solid #ddd;padding:.5em 0}";

/// Renders a [`Document`] as a self-contained HTML page.
///
/// Metadata text is escaped; body and comment markup are inserted as they
/// are, since the normalizer has already made them safe to render offline.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    lang: String,
    include_comments: bool,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self { lang: "zh-CN".to_string(), include_comments: true }
    }
}

impl HtmlRenderer {
    /// Creates a renderer for a `zh-CN` page with comments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page `lang` attribute.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Whether the comment section is rendered (default: true).
    pub fn include_comments(mut self, include: bool) -> Self {
        self.include_comments = include;
        self
    }

    /// Renders the page as a string.
    pub fn render_string(&self, document: &Document) -> String {
        let mut page = String::new();
        let title = escape_html(&document.title);

        let _ = writeln!(
            page,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<article>\n<header>",
            escape_html(&self.lang)
        );

        if !document.title_image.is_empty() {
            let _ = writeln!(
                page,
                "<img class=\"title-image\" src=\"{}\" alt=\"\">",
                escape_html(&document.title_image)
            );
        }
        let _ = writeln!(page, "<h1>{title}</h1>");

        page.push_str("<div class=\"byline\">");
        page.push_str(&avatar(&document.author_avatar));
        let _ = writeln!(
            page,
            "<span class=\"author\">{}</span> <time>{}</time></div>",
            escape_html(&document.author_name),
            escape_html(&document.published_time)
        );

        if !document.topics.is_empty() {
            page.push_str("<ul class=\"topics\">");
            for topic in &document.topics {
                let _ = write!(page, "<li>{}</li>", escape_html(topic));
            }
            page.push_str("</ul>\n");
        }

        page.push_str("</header>\n<section class=\"content\">\n");
        page.push_str(&document.content);
        page.push_str("\n</section>\n");

        if self.include_comments {
            page.push_str(&comment_section(document));
        }

        page.push_str("</article>\n</body>\n</html>\n");
        page
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        Ok(self.render_string(document).into_bytes())
    }

    fn extension(&self) -> &'static str {
        "html"
    }
}

fn avatar(src: &str) -> String {
    if src.is_empty() { String::new() } else { format!("<img class=\"avatar\" src=\"{}\" alt=\"\">", escape_html(src)) }
}

fn comment_section(document: &Document) -> String {
    let mut section = String::from("<section class=\"comments\">\n");
    let _ = writeln!(section, "<h2>Comments ({})</h2>", document.comments_count);

    for comment in &document.comments {
        section.push_str(&render_comment(comment));
    }

    if !document.comments_link.is_empty() && document.comments_count as usize > document.comments.len() {
        let _ = writeln!(
            section,
            "<p class=\"more\"><a href=\"{}\">All comments</a></p>",
            escape_html(&document.comments_link)
        );
    }

    section.push_str("</section>\n");
    section
}

fn render_comment(comment: &Comment) -> String {
    let mut block = String::from("<div class=\"comment\">\n<div class=\"comment-meta\">");
    block.push_str(&avatar(&comment.author_avatar));
    let _ = write!(block, "<span class=\"author\">{}</span>", escape_html(&comment.author_name));

    if let Some(target) = &comment.reply_to {
        let _ = write!(block, " replying to <span class=\"reply-to\">{}</span>", escape_html(target));
    }

    let _ = writeln!(
        block,
        " <time>{}</time> <span class=\"likes\">{} likes</span></div>\n<div class=\"comment-content\">{}</div>\n</div>",
        escape_html(&comment.created_time),
        comment.likes_count,
        comment.content
    );
    block
}
