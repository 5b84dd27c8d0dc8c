use std::fmt::Write as _;

use super::Renderer;
use crate::document::Document;
use crate::{OffprintError, Result};

/// Renders a [`Document`] as Markdown with TOML frontmatter.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    include_frontmatter: bool,
    include_comments: bool,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self { include_frontmatter: true, include_comments: true }
    }
}

impl MarkdownRenderer {
    /// Creates a renderer with frontmatter and comments enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether TOML frontmatter is emitted (default: true).
    pub fn include_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Whether the comment list is appended (default: true).
    pub fn include_comments(mut self, include: bool) -> Self {
        self.include_comments = include;
        self
    }

    /// Renders the document as a Markdown string.
    pub fn render_string(&self, document: &Document) -> Result<String> {
        let mut output = String::new();

        if self.include_frontmatter {
            output.push_str(&frontmatter(document));
            output.push('\n');
        }

        let _ = writeln!(output, "# {}\n", document.title);
        if !document.title_image.is_empty() {
            let _ = writeln!(output, "![]({})\n", document.title_image);
        }

        output.push_str(html_to_markdown(&document.content)?.trim_end());
        output.push('\n');

        if self.include_comments && !document.comments.is_empty() {
            let _ = write!(output, "\n## Comments ({})\n", document.comments_count);
            for comment in &document.comments {
                let _ = write!(output, "\n**{}**", comment.author_name);
                if let Some(target) = &comment.reply_to {
                    let _ = write!(output, " replying to **{target}**");
                }
                let _ = writeln!(output, " · {} · {} likes\n", comment.created_time, comment.likes_count);

                for line in html_to_markdown(&comment.content)?.trim().lines() {
                    let _ = writeln!(output, "> {line}");
                }
            }
        }

        Ok(output)
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        self.render_string(document).map(String::into_bytes)
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}

fn html_to_markdown(html: &str) -> Result<String> {
    htmd::convert(html).map_err(|e| OffprintError::Render(e.to_string()))
}

fn frontmatter(document: &Document) -> String {
    let mut frontmatter = String::from("+++");

    let _ = write!(frontmatter, "\ntitle = {}", toml_escape_string(&document.title));
    let _ = write!(frontmatter, "\nauthor = {}", toml_escape_string(&document.author_name));
    let _ = write!(frontmatter, "\ndate = {}", toml_escape_string(&document.published_time));

    if !document.topics.is_empty() {
        let topics: Vec<String> = document.topics.iter().map(|t| toml_escape_string(t)).collect();
        let _ = write!(frontmatter, "\ntopics = [{}]", topics.join(", "));
    }

    let _ = write!(frontmatter, "\ncomments_count = {}", document.comments_count);
    if !document.comments_link.is_empty() {
        let _ = write!(frontmatter, "\ncomments_link = {}", toml_escape_string(&document.comments_link));
    }

    frontmatter.push_str("\n+++\n");
    frontmatter
}

fn toml_escape_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
}
