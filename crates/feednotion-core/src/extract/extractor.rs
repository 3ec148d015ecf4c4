use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use super::text::extract_text;
use super::ArticleExtractor;
use crate::feed::{browser_headers, is_cloudflare_challenge, next_user_agent, ArticleContent};
use crate::{Error, Result};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";
const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

fn ensure_page_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_PAGE_BYTES {
        return Err(Error::Extraction(format!(
            "Page too large (over {} bytes) for URL: {}",
            MAX_PAGE_BYTES,
            url
        )));
    }
    Ok(())
}

/// Whether a Content-Type header value denotes an HTML document
fn is_html_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Downloads article pages and pulls their readable text
pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn download_html(&self, url: &str) -> Result<String> {
        let mut response = self.client
            .get(url)
            .headers(browser_headers(next_user_agent(), HTML_ACCEPT))
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("Request failed for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Extraction(format!("HTTP {} for URL: {}", status, url)));
        }

        // A missing header is treated as HTML
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or("");
            if !is_html_content_type(content_type) {
                return Err(Error::Extraction(format!(
                    "Unsupported content type '{}' for URL: {}",
                    content_type,
                    url
                )));
            }
        }

        if let Some(length) = response.content_length() {
            ensure_page_size(usize::try_from(length).unwrap_or(usize::MAX), url)?;
        }

        // Size cap is enforced per chunk
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to read body from {}: {}", url, e)))?
        {
            ensure_page_size(body.len() + chunk.len(), url)?;
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body).into_owned();

        if is_cloudflare_challenge(html.as_bytes()) {
            return Err(Error::Extraction(format!(
                "Cloudflare JavaScript challenge detected for URL: {}",
                url
            )));
        }

        Ok(html)
    }

    /// Fetch an article page and extract its text
    pub async fn fetch_article(&self, url: &str) -> Result<ArticleContent> {
        tracing::info!("Fetching article text from: {}", url);

        let html = self.download_html(url).await?;
        let raw_text = extract_text(&html)?;

        let content = ArticleContent {
            url: url.to_string(),
            raw_text,
        };

        if content.is_empty() {
            tracing::warn!("Extracted text is empty for {}", url);
        } else {
            tracing::info!("Extracted text from {} (length: {})", url, content.char_len());
        }

        Ok(content)
    }
}

#[async_trait::async_trait]
impl ArticleExtractor for ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ArticleContent> {
        self.fetch_article(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("Application/XHTML+XML"));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("application/json; charset=utf-8"));
        assert!(!is_html_content_type(""));
    }

    #[test]
    fn test_page_size_limit() {
        assert!(ensure_page_size(MAX_PAGE_BYTES, "https://example.com/a").is_ok());
        assert!(matches!(
            ensure_page_size(MAX_PAGE_BYTES + 1, "https://example.com/a"),
            Err(Error::Extraction(ref m)) if m.contains("too large")
        ));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_extraction_error() {
        let extractor = ContentExtractor::new(Client::new());
        let result = extractor.fetch_article("http://[::1]:1/article").await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
