//! Article assembly.
//!
//! The [`Assembler`] drives the whole pipeline for one article URL:
//!
//! 1. metadata: title, title image, author, publish time, slug, comment link
//! 2. content: body markup and topics
//! 3. assets: title image and author avatar are localized
//! 4. normalize: lazy-load resolution, image localization, heading demotion
//! 5. comments: first page of the thread, avatars and inline images localized
//!
//! Steps run in order since each depends on the previous one. A failure in
//! any step aborts with [`OffprintError::Assembly`](crate::OffprintError::Assembly) naming the step; no
//! partial document is ever returned.
//!
//! # Example
//!
//! ```no_run
//! use offprint_core::{Assembler, HtmlRenderer, OffprintConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OffprintConfig::builder().asset_dir("out/img").build();
//! let assembler = Assembler::new(config)?;
//! let page = assembler
//!     .render("https://zhuanlan.zhihu.com/api/columns/example/posts?limit=1", &HtmlRenderer::new())
//!     .await?;
//! std::fs::write("out/article.html", page)?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::{AssetCache, AssetPolicy, DEFAULT_ASSET_PREFIX};
use crate::document::{Comment, Document};
use crate::fetch::{FetchConfig, Fetcher, parse_http_url};
use crate::normalize::{localize_images, normalize_body};
use crate::payload::{ArticleContent, ArticleMeta, CommentRecord};
use crate::render::Renderer;
use crate::{AssemblyStep, Result, timestamp};

#[cfg(feature = "fetch")]
use crate::fetch::HttpFetcher;

/// Default API host for content and comment endpoints.
pub const DEFAULT_API_BASE: &str = "https://zhuanlan.zhihu.com";

/// Configuration for an [`Assembler`].
///
/// # Example
///
/// ```rust
/// use offprint_core::{AssetPolicy, OffprintConfig};
///
/// let config = OffprintConfig::builder()
///     .comment_limit(20)
///     .avatar_size("l")
///     .asset_policy(AssetPolicy::Strict)
///     .build();
/// assert_eq!(config.comment_limit, 20);
/// ```
#[derive(Debug, Clone)]
pub struct OffprintConfig {
    /// Base URL for the content and comment endpoints (default: `https://zhuanlan.zhihu.com`).
    pub api_base: String,

    /// Directory downloaded images are stored in (default: `./out/img`).
    pub asset_dir: PathBuf,

    /// Prefix of the local image references written into the document (default: `./img`).
    pub asset_prefix: String,

    /// Number of comments fetched (default: 10).
    pub comment_limit: usize,

    /// Size token substituted into avatar templates (default: `xs`).
    pub avatar_size: String,

    /// What happens when an image cannot be localized (default: degrade).
    pub asset_policy: AssetPolicy,

    /// Maximum number of simultaneous image downloads (default: 4).
    pub max_concurrent_downloads: usize,

    /// HTTP settings.
    pub fetch: FetchConfig,
}

impl Default for OffprintConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            asset_dir: PathBuf::from("./out/img"),
            asset_prefix: DEFAULT_ASSET_PREFIX.to_string(),
            comment_limit: 10,
            avatar_size: "xs".to_string(),
            asset_policy: AssetPolicy::default(),
            max_concurrent_downloads: 4,
            fetch: FetchConfig::default(),
        }
    }
}

impl OffprintConfig {
    /// Creates a new builder for OffprintConfig.
    pub fn builder() -> OffprintConfigBuilder {
        OffprintConfigBuilder::new()
    }
}

/// Builder for [`OffprintConfig`].
pub struct OffprintConfigBuilder {
    config: OffprintConfig,
}

impl OffprintConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: OffprintConfig::default() }
    }

    /// Sets the API base URL.
    pub fn api_base(mut self, value: impl Into<String>) -> Self {
        self.config.api_base = value.into();
        self
    }

    /// Sets the image storage directory.
    pub fn asset_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.asset_dir = value.into();
        self
    }

    /// Sets the local reference prefix.
    pub fn asset_prefix(mut self, value: impl Into<String>) -> Self {
        self.config.asset_prefix = value.into();
        self
    }

    /// Sets the number of comments fetched.
    pub fn comment_limit(mut self, value: usize) -> Self {
        self.config.comment_limit = value;
        self
    }

    /// Sets the avatar size token.
    pub fn avatar_size(mut self, value: impl Into<String>) -> Self {
        self.config.avatar_size = value.into();
        self
    }

    /// Sets the asset failure policy.
    pub fn asset_policy(mut self, value: AssetPolicy) -> Self {
        self.config.asset_policy = value;
        self
    }

    /// Sets the download concurrency bound.
    pub fn max_concurrent_downloads(mut self, value: usize) -> Self {
        self.config.max_concurrent_downloads = value;
        self
    }

    /// Sets the HTTP settings.
    pub fn fetch(mut self, value: FetchConfig) -> Self {
        self.config.fetch = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> OffprintConfig {
        self.config
    }
}

impl Default for OffprintConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Header fields after the assets step.
struct HeaderAssets {
    title_image: String,
    author_avatar: String,
}

/// Fetches, normalizes and assembles articles into [`Document`]s.
///
/// Owns one [`AssetCache`] for its storage root; every image the assembler
/// touches goes through it.
pub struct Assembler {
    config: OffprintConfig,
    fetcher: Arc<dyn Fetcher>,
    assets: AssetCache,
}

impl Assembler {
    /// Creates an assembler that fetches over HTTP.
    #[cfg(feature = "fetch")]
    pub fn new(config: OffprintConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates an assembler on top of any [`Fetcher`].
    pub fn with_fetcher(config: OffprintConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let assets = AssetCache::new(config.asset_dir.clone(), Arc::clone(&fetcher))
            .with_prefix(config.asset_prefix.clone())
            .with_max_concurrent(config.max_concurrent_downloads);

        Self { config, fetcher, assets }
    }

    /// The configuration this assembler was built with.
    pub fn config(&self) -> &OffprintConfig {
        &self.config
    }

    /// The asset cache backing this assembler.
    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Assembles the article whose metadata lives at `article_url`.
    ///
    /// # Errors
    ///
    /// Returns [`OffprintError::Assembly`](crate::OffprintError::Assembly) naming the failed step.
    pub async fn assemble(&self, article_url: &str) -> Result<Document> {
        let meta = self.fetch_metadata(article_url).await.map_err(|e| e.at(AssemblyStep::Metadata))?;
        let published_time = timestamp::to_local(&meta.published_time).map_err(|e| e.at(AssemblyStep::Metadata))?;

        let content = self.fetch_content(&meta).await.map_err(|e| e.at(AssemblyStep::Content))?;
        let comments_link = self.comments_url(&meta);

        let header = self.localize_header(&meta).await.map_err(|e| e.at(AssemblyStep::Assets))?;

        let body = normalize_body(&content.content, &self.assets, self.config.asset_policy)
            .await
            .map_err(|e| e.at(AssemblyStep::Normalize))?;

        let comments = self
            .fetch_comments(&comments_link)
            .await
            .map_err(|e| e.at(AssemblyStep::Comments))?;

        tracing::info!(title = %meta.title, comments = comments.len(), "article assembled");

        Document::builder()
            .title(meta.title)
            .title_image(header.title_image)
            .author_name(meta.author.name)
            .author_avatar(header.author_avatar)
            .published_time(published_time)
            .topics(content.topic_names())
            .content(body)
            .comments(comments)
            .comments_count(meta.comments_count)
            .comments_link(comments_link)
            .build()
    }

    /// Assembles the article and renders it.
    pub async fn render(&self, article_url: &str, renderer: &dyn Renderer) -> Result<Vec<u8>> {
        let document = self.assemble(article_url).await?;
        renderer.render(&document)
    }

    async fn fetch_metadata(&self, article_url: &str) -> Result<ArticleMeta> {
        parse_http_url(article_url)?;
        let raw = self.fetcher.get_json(article_url).await?;
        let meta = ArticleMeta::from_value(raw)?;

        tracing::debug!(title = %meta.title, slug = %meta.slug, "metadata fetched");
        Ok(meta)
    }

    async fn fetch_content(&self, meta: &ArticleMeta) -> Result<ArticleContent> {
        let url = format!("{}/api/posts/{}", self.api_base(), meta.slug);
        let raw = self.fetcher.get_json(&url).await?;
        ArticleContent::from_value(raw)
    }

    /// URL of the comment thread; relative links are joined onto the API base.
    fn comments_url(&self, meta: &ArticleMeta) -> String {
        let link = meta.links.comments.trim();
        if link.is_empty() {
            format!("{}/api/posts/{}/comments", self.api_base(), meta.slug)
        } else if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.api_base(), link.trim_start_matches('/'))
        }
    }

    async fn localize_header(&self, meta: &ArticleMeta) -> Result<HeaderAssets> {
        let title_url = meta.title_image.clone().unwrap_or_default();
        let avatar_url = meta
            .author
            .avatar
            .as_ref()
            .map(|avatar| avatar.url(&self.config.avatar_size))
            .unwrap_or_default();

        let mut resolved = self.assets.resolve_many(&[title_url.clone(), avatar_url.clone()]).await.into_iter();
        let policy = self.config.asset_policy;
        let title_image = policy.settle(&title_url, next_outcome(&mut resolved))?;
        let author_avatar = policy.settle(&avatar_url, next_outcome(&mut resolved))?;

        Ok(HeaderAssets { title_image, author_avatar })
    }

    async fn fetch_comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        let mut url = parse_http_url(comments_url)?;
        url.query_pairs_mut()
            .append_pair("limit", &self.config.comment_limit.to_string())
            .append_pair("offset", "0");

        let raw = self.fetcher.get_json(url.as_str()).await?;
        let records = CommentRecord::list_from_value(raw)?;
        tracing::debug!(count = records.len(), "comments fetched");

        let avatar_urls: Vec<String> = records
            .iter()
            .map(|record| {
                record
                    .author
                    .avatar
                    .as_ref()
                    .map(|avatar| avatar.url(&self.config.avatar_size))
                    .unwrap_or_default()
            })
            .collect();
        let avatars = self.assets.resolve_many(&avatar_urls).await;

        let policy = self.config.asset_policy;
        let mut comments = Vec::with_capacity(records.len());
        for ((record, avatar_url), avatar) in records.into_iter().zip(&avatar_urls).zip(avatars) {
            let author_avatar = policy.settle(avatar_url, avatar)?;
            let content = localize_images(&record.content, &self.assets, policy).await?;

            comments.push(Comment {
                created_time: timestamp::to_local(&record.created_time)?,
                reply_to: record.reply_target(),
                author_name: record.author.name,
                author_avatar,
                content,
                likes_count: record.likes_count,
            });
        }

        Ok(comments)
    }

    fn api_base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }
}

fn next_outcome(outcomes: &mut impl Iterator<Item = Result<String>>) -> Result<String> {
    outcomes.next().unwrap_or_else(|| Ok(String::new()))
}

/// Assembles and renders one article with a fresh HTTP-backed assembler.
///
/// # Example
///
/// ```no_run
/// use offprint_core::{JsonRenderer, OffprintConfig, fetch_and_render};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let json = fetch_and_render(
///         "https://zhuanlan.zhihu.com/api/columns/example/posts?limit=1",
///         &OffprintConfig::default(),
///         &JsonRenderer::new(),
///     )
///     .await?;
///     println!("{}", String::from_utf8_lossy(&json));
///     Ok(())
/// }
/// ```
#[cfg(feature = "fetch")]
pub async fn fetch_and_render(article_url: &str, config: &OffprintConfig, renderer: &dyn Renderer) -> Result<Vec<u8>> {
    Assembler::new(config.clone())?.render(article_url, renderer).await
}
