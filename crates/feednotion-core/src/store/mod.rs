mod notion;

pub use notion::NotionWriter;

use crate::feed::Summary;
use crate::Result;

/// Persistence target for finished summaries
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Create one record for the summary
    async fn write(&self, summary: &Summary) -> Result<()>;
}
