use serde::Serialize;

use super::Renderer;
use crate::document::Document;
use crate::{OffprintError, Result};

/// Serializes a [`Document`] as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pretty: bool,
    include_text: bool,
}

/// JSON shape: the document fields plus an optional plain-text rendition.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    document: &'a Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl JsonRenderer {
    /// Creates a compact renderer without the `text` field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty print the output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Add a `text` field with the body's plain text.
    pub fn include_text(mut self, include: bool) -> Self {
        self.include_text = include;
        self
    }

    /// Renders the document as a JSON string.
    pub fn render_string(&self, document: &Document) -> Result<String> {
        let output = JsonOutput { document, text: self.include_text.then(|| document.text_content()) };

        let json = if self.pretty { serde_json::to_string_pretty(&output) } else { serde_json::to_string(&output) };
        json.map_err(|e| OffprintError::Render(e.to_string()))
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        self.render_string(document).map(String::into_bytes)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
