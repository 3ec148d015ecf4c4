mod gemini_api;

pub use gemini_api::GeminiApiProvider;

use crate::Result;

/// Trait for AI summarization providers
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Generate a summary for the given content
    async fn summarize(&self, content: &str) -> Result<String>;
}
