mod fetcher;
mod models;
mod parser;

pub use fetcher::FeedFetcher;
pub(crate) use fetcher::{browser_headers, build_client, is_cloudflare_challenge, next_user_agent};
pub use models::{ArticleContent, FeedEntry, Summary};
pub use parser::parse_feed;

use crate::Result;

/// Source of feed entries for the job runner
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch at most `limit` entries from `url`, in feed order
    async fn fetch_entries(&self, url: &str, limit: usize) -> Result<Vec<FeedEntry>>;
}
