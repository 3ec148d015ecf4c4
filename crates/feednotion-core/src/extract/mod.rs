mod extractor;
mod text;

pub use extractor::ContentExtractor;
pub use text::extract_text;

use crate::feed::ArticleContent;
use crate::Result;

/// Turns an article URL into readable text
#[async_trait::async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ArticleContent>;
}
