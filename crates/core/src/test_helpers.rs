//! In-memory fetcher shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::Fetcher;
use crate::{OffprintError, Result};

/// Serves canned JSON and byte bodies and records every request.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    json: HashMap<String, Value>,
    bytes: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_json(mut self, url: &str, value: Value) -> Self {
        self.json.insert(url.to_string(), value);
        self
    }

    pub(crate) fn with_bytes(mut self, url: &str, body: &[u8]) -> Self {
        self.bytes.insert(url.to_string(), body.to_vec());
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }

    fn record(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.record(url);
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| OffprintError::Status { url: url.to_string(), status: 404 })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.record(url);
        self.bytes
            .get(url)
            .cloned()
            .ok_or_else(|| OffprintError::Status { url: url.to_string(), status: 404 })
    }
}
