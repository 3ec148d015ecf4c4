use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{Client, Proxy};
use url::Url;

use super::models::FeedEntry;
use super::parser::parse_feed;
use super::FeedSource;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

// Rotating User-Agent pool, some feeds reject non-browser clients
static USER_AGENT_INDEX: AtomicUsize = AtomicUsize::new(0);
const USER_AGENTS: &[&str] = &[
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Get the next User-Agent in rotation
pub(crate) fn next_user_agent() -> &'static str {
    let index = USER_AGENT_INDEX.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
    USER_AGENTS[index]
}

/// Build the shared HTTP client with optional proxy
pub(crate) fn build_client(timeout: Duration, proxy_url: &Option<String>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(ref proxy) = proxy_url {
        let proxy = Proxy::all(proxy)
            .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
        builder = builder.proxy(proxy);
        tracing::info!("Using HTTP proxy for outbound requests");
    }

    builder.build().map_err(Error::Http)
}

/// Build browser-like headers for a request
pub(crate) fn browser_headers(user_agent: &str, accept: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, ua);
    }
    headers
}

/// Check if content is a Cloudflare challenge page
pub(crate) fn is_cloudflare_challenge(content: &[u8]) -> bool {
    // Markers sit in the first 2KB
    let check_len = content.len().min(2048);
    let preview = String::from_utf8_lossy(&content[..check_len]);

    preview.contains("Just a moment...")
        || preview.contains("cf-browser-verification")
        || preview.contains("_cf_chl_opt")
        || preview.contains("challenge-platform")
}

/// Downloads and parses the configured feed
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let user_agent = next_user_agent();
        tracing::debug!("Fetching {} with User-Agent: {}", url, user_agent);

        let response = self.client
            .get(url)
            .headers(browser_headers(
                user_agent,
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5",
            ))
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Request failed for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {} for URL: {}", status, url)));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body from {}: {}", url, e)))?;

        ensure_content_size(content.len(), url)?;

        if is_cloudflare_challenge(&content) {
            return Err(Error::Fetch(format!(
                "Cloudflare JavaScript challenge detected for URL: {}. \
                The site requires browser verification, try configuring HTTP_PROXY_URL.",
                url
            )));
        }

        Ok(content)
    }

    /// Fetch and parse a feed, keeping at most `limit` entries in feed order
    pub async fn fetch(&self, url: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        Url::parse(url).map_err(|e| Error::Fetch(format!("Invalid feed URL {}: {}", url, e)))?;

        tracing::info!("Fetching feed from: {}", url);
        let content = self.download(url).await?;

        let mut entries = parse_feed(&content)?;
        tracing::info!("Found {} entries in feed: {}", entries.len(), url);

        entries.truncate(limit);
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_entries(&self, url: &str, limit: usize) -> Result<Vec<FeedEntry>> {
        self.fetch(url, limit).await
    }
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::Fetch(format!(
            "Feed too large ({} bytes) for URL: {}",
            size,
            url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let first = next_user_agent();
        let second = next_user_agent();
        assert!(USER_AGENTS.contains(&first));
        assert!(USER_AGENTS.contains(&second));
    }

    #[test]
    fn test_cloudflare_challenge_detection() {
        let page = b"<html><head><title>Just a moment...</title></head></html>";
        assert!(is_cloudflare_challenge(page));
        assert!(!is_cloudflare_challenge(b"<rss version=\"2.0\"><channel></channel></rss>"));
    }

    #[test]
    fn test_content_size_limit() {
        assert!(ensure_content_size(1024, "https://example.com/feed.xml").is_ok());
        assert!(matches!(
            ensure_content_size(MAX_FEED_BYTES + 1, "https://example.com/feed.xml"),
            Err(Error::Fetch(_))
        ));
    }

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let result = build_client(Duration::from_secs(5), &Some("::not a proxy::".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_feed_url_is_fetch_error() {
        let fetcher = FeedFetcher::new(Client::new());
        let result = fetcher.fetch("not a url", 3).await;
        assert!(matches!(result, Err(Error::Fetch(_))));
    }
}
