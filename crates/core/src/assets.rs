//! Local image cache.
//!
//! [`AssetCache`] maps remote image URLs to files under a storage root and
//! hands back the reference the rendered page should use (`./img/<name>` by
//! default). A file that already exists is never fetched again, which makes
//! repeated runs against the same storage root free.
//!
//! The cache key is the trailing path segment of the URL. Two different URLs
//! ending in the same segment share one file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use tokio::fs;
use url::Url;

use crate::fetch::Fetcher;
use crate::{OffprintError, Result};

/// Default public prefix for local references.
pub const DEFAULT_ASSET_PREFIX: &str = "./img";

/// Derives the cache filename for `url`.
///
/// Uses the last non-empty path segment, ignoring query and fragment. Returns
/// `None` when no usable segment exists.
///
/// # Example
///
/// ```rust
/// use offprint_core::assets::asset_file_name;
///
/// assert_eq!(asset_file_name("https://pic1.example.com/v2-abc_xs.jpg?w=10"), Some("v2-abc_xs.jpg".to_string()));
/// assert_eq!(asset_file_name("https://pic1.example.com/"), None);
/// ```
pub fn asset_file_name(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => {
            let without_suffix = url.split(['?', '#']).next().unwrap_or(url);
            without_suffix.rsplit('/').next().map(str::to_string)
        }
    }?;

    match segment.as_str() {
        "" | "." | ".." => None,
        _ => Some(segment),
    }
}

/// What to do when a non-critical image cannot be localized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetPolicy {
    /// Replace the reference with an empty string and log a warning.
    #[default]
    Degrade,
    /// Abort the assembly.
    Strict,
}

impl AssetPolicy {
    /// Applies the policy to one resolution outcome.
    pub fn settle(self, url: &str, outcome: Result<String>) -> Result<String> {
        match (self, outcome) {
            (_, Ok(reference)) => Ok(reference),
            (AssetPolicy::Degrade, Err(e)) => {
                tracing::warn!(%url, error = %e, "asset unavailable, leaving reference empty");
                Ok(String::new())
            }
            (AssetPolicy::Strict, Err(e)) => Err(e),
        }
    }
}

/// Download-once image store rooted at a directory.
///
/// Construct one per storage root and share it by reference; concurrent
/// [`resolve`](AssetCache::resolve) calls for the same filename are
/// serialized so the file is downloaded and written once.
pub struct AssetCache {
    root: PathBuf,
    prefix: String,
    fetcher: Arc<dyn Fetcher>,
    max_concurrent: usize,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AssetCache {
    /// Creates a cache storing files under `root`.
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root: root.into(),
            prefix: DEFAULT_ASSET_PREFIX.to_string(),
            fetcher,
            max_concurrent: 4,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the prefix of returned references (default `./img`).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets how many downloads [`resolve_many`](AssetCache::resolve_many) runs at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the public reference for a cached filename.
    pub fn local_reference(&self, name: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() { name.to_string() } else { format!("{prefix}/{name}") }
    }

    /// Resolves `url` to a local reference, downloading it if needed.
    ///
    /// An empty or absent URL yields an empty string without touching the
    /// network. Download and storage failures come back as
    /// [`OffprintError::Asset`] carrying the URL.
    pub async fn resolve(&self, url: Option<&str>) -> Result<String> {
        let url = match url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Ok(String::new()),
        };

        let name = asset_file_name(url)
            .ok_or_else(|| OffprintError::InvalidUrl(format!("{url}: no file name in path")).for_asset(url))?;
        let path = self.root.join(&name);
        let reference = self.local_reference(&name);

        let key_lock = self.key_lock(&name);
        let outcome = {
            let _guard = key_lock.lock().await;
            self.fetch_once(url, &name, &path).await
        };
        self.release_key(&name, &key_lock);

        outcome.map(|()| reference)
    }

    /// Downloads `url` into `path` unless the file is already there.
    async fn fetch_once(&self, url: &str, name: &str, path: &Path) -> Result<()> {
        if is_cached(path).await.map_err(|e| OffprintError::from(e).for_asset(url))? {
            tracing::debug!(%url, file = %name, "asset cache hit");
            return Ok(());
        }

        let bytes = self.fetcher.get_bytes(url).await.map_err(|e| e.for_asset(url))?;
        self.persist(name, &bytes)
            .await
            .map_err(|e| OffprintError::from(e).for_asset(url))?;

        tracing::info!(%url, file = %name, size = bytes.len(), "asset downloaded");
        Ok(())
    }

    /// Resolves a batch of URLs concurrently.
    ///
    /// Results are returned in input order, one per URL.
    pub async fn resolve_many(&self, urls: &[String]) -> Vec<Result<String>> {
        stream::iter(urls)
            .map(|url| self.resolve(Some(url.as_str())))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    fn key_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(in_flight.entry(name.to_string()).or_default())
    }

    /// Drops the lock for `name` once no other resolution holds it.
    ///
    /// Clones are only handed out under the map lock, so a count of two (the
    /// map's and the caller's) means nobody else is waiting.
    fn release_key(&self, name: &str, key_lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if Arc::strong_count(key_lock) <= 2 && in_flight.get(name).is_some_and(|held| Arc::ptr_eq(held, key_lock)) {
            in_flight.remove(name);
        }
    }

    /// Writes to a temporary sibling first so a partial download never
    /// appears under the final name.
    async fn persist(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;

        let partial = self.root.join(format!(".{name}.part"));
        fs::write(&partial, bytes).await?;
        if let Err(e) = fs::rename(&partial, self.root.join(name)).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        Ok(())
    }
}

async fn is_cached(path: &Path) -> io::Result<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
