//! Output renderers.
//!
//! A [`Renderer`] turns a finished [`Document`] into bytes ready to be
//! written to disk. The document's field names are the contract every
//! renderer reads from.

use crate::Result;
use crate::document::Document;

pub mod html;
pub mod json;
#[cfg(feature = "markdown")]
pub mod markdown;

pub use html::HtmlRenderer;
pub use json::JsonRenderer;
#[cfg(feature = "markdown")]
pub use markdown::MarkdownRenderer;

/// Presentation step at the end of the pipeline.
pub trait Renderer: Send + Sync {
    /// Renders `document`.
    fn render(&self, document: &Document) -> Result<Vec<u8>>;

    /// File extension of the output, without the dot.
    fn extension(&self) -> &'static str;
}

/// Escapes text for use in HTML content and attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
pub(crate) fn sample_document() -> Document {
    use crate::document::Comment;

    Document::builder()
        .title("Example <Title>")
        .title_image("./img/a.jpg")
        .author_name("Alice & Co")
        .author_avatar("./img/av1_xs.jpg")
        .published_time("2017-03-01 20:34")
        .topics(vec!["Rust".to_string(), "Databases".to_string()])
        .content(r#"<h2>Inner</h2><p>Body with <a href="https://example.com">a link</a>.</p><img src="./img/b.png">"#)
        .comments(vec![
            Comment {
                author_name: "Bob".to_string(),
                author_avatar: "./img/av2_xs.jpg".to_string(),
                content: "<p>Nice</p>".to_string(),
                created_time: "2017-03-02 08:00".to_string(),
                likes_count: 3,
                reply_to: None,
            },
            Comment {
                author_name: "Carol".to_string(),
                author_avatar: String::new(),
                content: "<p>Agreed</p>".to_string(),
                created_time: "2017-03-02 09:15".to_string(),
                likes_count: 0,
                reply_to: Some("Bob".to_string()),
            },
        ])
        .comments_count(7)
        .comments_link("https://api.example.com/api/posts/s1/comments")
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
