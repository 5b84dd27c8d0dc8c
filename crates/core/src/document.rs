//! Assembled document model.
//!
//! [`Document`] is what renderers consume: article metadata, the normalized
//! body, and the comment list, with every image reference pointing at a local
//! file. Its field names are the template contract.
//!
//! Assembly stages contribute their outputs to a [`DocumentBuilder`]; the
//! document only comes into existence once every required part is present.

use serde::Serialize;

use crate::{OffprintError, Result};

/// One comment on the article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Comment author display name.
    pub author_name: String,
    /// Local reference to the author's avatar, or empty.
    pub author_avatar: String,
    /// Comment body markup.
    pub content: String,
    /// Local creation time, `YYYY-MM-DD HH:MM`.
    pub created_time: String,
    /// Number of likes.
    pub likes_count: u64,
    /// Name of the user this comment replies to.
    pub reply_to: Option<String>,
}

/// A fully assembled, offline-renderable article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Article title.
    pub title: String,

    /// Local reference to the title image, or empty when the article has none.
    pub title_image: String,

    /// Author display name.
    pub author_name: String,

    /// Local reference to the author's avatar, or empty.
    pub author_avatar: String,

    /// Local publish time, `YYYY-MM-DD HH:MM`.
    pub published_time: String,

    /// Topic names in source order.
    pub topics: Vec<String>,

    /// Normalized body markup.
    pub content: String,

    /// Comments in source order.
    pub comments: Vec<Comment>,

    /// Total comment count reported by the source (may exceed `comments.len()`).
    pub comments_count: u64,

    /// URL of the comment thread.
    pub comments_link: String,
}

impl Document {
    /// Starts a builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Plain text of the body, tags stripped.
    pub fn text_content(&self) -> String {
        let fragment = scraper::Html::parse_fragment(&self.content);
        fragment.root_element().text().collect()
    }

    /// Gets the document as structured JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| OffprintError::Render(e.to_string()))
    }
}

/// Collects stage outputs and produces a [`Document`].
///
/// Title, author name, publish time and body are required; `build` reports
/// the first missing one as [`OffprintError::MissingField`].
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    title_image: String,
    author_name: Option<String>,
    author_avatar: String,
    published_time: Option<String>,
    topics: Vec<String>,
    content: Option<String>,
    comments: Vec<Comment>,
    comments_count: u64,
    comments_link: String,
}

impl DocumentBuilder {
    /// Sets the article title.
    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    /// Sets the local title image reference.
    pub fn title_image(mut self, value: impl Into<String>) -> Self {
        self.title_image = value.into();
        self
    }

    /// Sets the author name.
    pub fn author_name(mut self, value: impl Into<String>) -> Self {
        self.author_name = Some(value.into());
        self
    }

    /// Sets the local author avatar reference.
    pub fn author_avatar(mut self, value: impl Into<String>) -> Self {
        self.author_avatar = value.into();
        self
    }

    /// Sets the formatted publish time.
    pub fn published_time(mut self, value: impl Into<String>) -> Self {
        self.published_time = Some(value.into());
        self
    }

    /// Sets the topic names.
    pub fn topics(mut self, value: Vec<String>) -> Self {
        self.topics = value;
        self
    }

    /// Sets the normalized body markup.
    pub fn content(mut self, value: impl Into<String>) -> Self {
        self.content = Some(value.into());
        self
    }

    /// Sets the assembled comments.
    pub fn comments(mut self, value: Vec<Comment>) -> Self {
        self.comments = value;
        self
    }

    /// Sets the total comment count reported by the API.
    pub fn comments_count(mut self, value: u64) -> Self {
        self.comments_count = value;
        self
    }

    /// Sets the comment thread URL.
    pub fn comments_link(mut self, value: impl Into<String>) -> Self {
        self.comments_link = value.into();
        self
    }

    /// Finalizes the document.
    pub fn build(self) -> Result<Document> {
        Ok(Document {
            title: required(self.title, "title")?,
            title_image: self.title_image,
            author_name: required(self.author_name, "author.name")?,
            author_avatar: self.author_avatar,
            published_time: required(self.published_time, "publishedTime")?,
            topics: self.topics,
            content: required(self.content, "content")?,
            comments: self.comments,
            comments_count: self.comments_count,
            comments_link: self.comments_link,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| OffprintError::MissingField { field: field.to_string() })
}
