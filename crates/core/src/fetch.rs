//! Remote payload fetching.
//!
//! The pipeline talks to the network only through the [`Fetcher`] trait, which
//! exposes the two capabilities it needs: fetch a JSON document and fetch raw
//! bytes. [`HttpFetcher`] is the reqwest-backed implementation used in
//! production; tests substitute in-memory fetchers.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "fetch")]
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::{OffprintError, Result};

/// HTTP client configuration for fetching payloads and images.
///
/// This struct controls timeout and user agent settings for HTTP requests.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; Offprint/0.1)".to_string() }
    }
}

impl FetchConfig {
    /// Timeout as a [`Duration`].
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Retrieval capability consumed by the asset cache and the assembler.
///
/// Implementations must be shareable across tasks: the asset cache calls
/// [`get_bytes`](Fetcher::get_bytes) from several downloads at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and decodes the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value>;

    /// Fetches `url` and returns the raw body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Validates that `url` is absolute and uses an HTTP(S) scheme.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| OffprintError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(OffprintError::InvalidUrl(format!(
            "{url}: unsupported scheme `{other}` (expected http or https)"
        ))),
    }
}

/// Reqwest-backed [`Fetcher`].
///
/// One client is built up front and reused for every request, so connection
/// pooling applies across the metadata, content, comment and image fetches of
/// an assembly.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    /// Builds a fetcher with the given timeout and User-Agent.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout_duration())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(OffprintError::Http)?;

        Ok(Self { client, config })
    }

    /// The configuration this fetcher was built with.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response> {
        let parsed = parse_http_url(url)?;
        tracing::debug!(%url, "fetching");

        let response = self
            .client
            .get(parsed)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OffprintError::Status { url: url.to_string(), status: status.as_u16() });
        }

        Ok(response)
    }

    fn classify(&self, err: reqwest::Error) -> OffprintError {
        if err.is_timeout() { OffprintError::Timeout { timeout: self.config.timeout } } else { OffprintError::Http(err) }
    }
}

#[cfg(feature = "fetch")]
#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.get(url, "application/json, text/plain;q=0.9, */*;q=0.8").await?;
        let body = response.text().await.map_err(|e| self.classify(e))?;

        serde_json::from_str(&body).map_err(|e| OffprintError::MalformedPayload(format!("{url}: {e}")))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url, "image/*, */*;q=0.8").await?;
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("Offprint"));
        assert_eq!(config.timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com/api/posts/1").is_ok());
        assert!(parse_http_url("http://example.com").is_ok());
        assert!(matches!(parse_http_url("example.com"), Err(OffprintError::InvalidUrl(_))));
        assert!(matches!(parse_http_url("ftp://example.com/a.jpg"), Err(OffprintError::InvalidUrl(_))));
    }

    #[cfg(feature = "fetch")]
    mod http {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_get_json() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/posts/s1"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"content":"<p>hi</p>"}"#))
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
            let value = fetcher.get_json(&format!("{}/api/posts/s1", server.uri())).await.unwrap();
            assert_eq!(value["content"], "<p>hi</p>");
        }

        #[tokio::test]
        async fn test_get_json_malformed() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
            let result = fetcher.get_json(&server.uri()).await;
            assert!(matches!(result, Err(OffprintError::MalformedPayload(_))));
        }

        #[tokio::test]
        async fn test_non_success_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
            let result = fetcher.get_bytes(&format!("{}/missing.png", server.uri())).await;
            assert!(matches!(result, Err(OffprintError::Status { status: 404, .. })));
        }

        #[tokio::test]
        async fn test_timeout() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(FetchConfig { timeout: 1, ..Default::default() }).unwrap();
            let result = fetcher.get_bytes(&server.uri()).await;
            assert!(matches!(result, Err(OffprintError::Timeout { timeout: 1 })));
        }

        #[tokio::test]
        async fn test_invalid_url() {
            let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
            let result = fetcher.get_json("not-a-url").await;
            assert!(matches!(result, Err(OffprintError::InvalidUrl(_))));
        }
    }
}
