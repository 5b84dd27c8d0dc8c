//! Typed views of the raw API payloads.
//!
//! Field names follow the API's camelCase JSON. Title, body and author name
//! are required and surface as [`OffprintError::MissingField`] when absent;
//! everything else falls back to an empty value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{OffprintError, Result};

/// Article metadata from the column listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMeta {
    pub title: String,
    #[serde(default)]
    pub title_image: Option<String>,
    pub author: Author,
    pub published_time: Value,
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub comments_count: u64,
}

impl ArticleMeta {
    /// Decodes a metadata payload.
    ///
    /// Listing endpoints answer with an array; its first element is the
    /// article.
    pub fn from_value(value: Value) -> Result<Self> {
        let item = match value {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| OffprintError::MissingField { field: "[0]".to_string() })?,
            other => other,
        };

        Ok(serde_json::from_value(item)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
}

/// Avatar reference: a URL template with `{id}` and `{size}` tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct Avatar {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub template: String,
}

impl Avatar {
    /// Substitutes the id and `size` into the template.
    pub fn url(&self, size: &str) -> String {
        self.template.replace("{id}", &self.id).replace("{size}", size)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub comments: String,
}

/// Article body from the post endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleContent {
    pub content: String,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl ArticleContent {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub name: String,
}

/// One record of the comments endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub author: Author,
    #[serde(default)]
    pub content: String,
    pub created_time: Value,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub in_reply_to_comment_id: Value,
    #[serde(default)]
    pub in_reply_to_user: Option<ReplyUser>,
}

impl CommentRecord {
    /// Decodes a comments payload: a bare array, or an object with a `data` array.
    pub fn list_from_value(value: Value) -> Result<Vec<Self>> {
        let items = match value {
            Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
            other => other,
        };

        Ok(serde_json::from_value(items)?)
    }

    /// Name of the replied-to user; `None` when the reply id is the `0` sentinel.
    pub fn reply_target(&self) -> Option<String> {
        let is_reply = match &self.in_reply_to_comment_id {
            Value::Null => false,
            Value::Number(n) => n.as_f64() != Some(0.0),
            Value::String(s) => !s.is_empty() && s != "0",
            _ => true,
        };

        if !is_reply {
            return None;
        }

        self.in_reply_to_user.as_ref().map(|user| user.name.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyUser {
    pub name: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, found {other}"))),
    }
}
