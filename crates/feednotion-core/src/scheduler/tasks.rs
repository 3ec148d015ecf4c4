use std::fmt;
use std::sync::Arc;

use crate::ai::Summarizer;
use crate::extract::ArticleExtractor;
use crate::feed::{FeedEntry, FeedSource, Summary};
use crate::store::ArticleStore;
use crate::{Error, Result};

/// Step of the per-entry pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Summarize,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Summarize => "summarize",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// A single entry that did not make it into the store
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub url: String,
    pub title: String,
    pub stage: Stage,
    pub message: String,
}

/// Outcome of one job run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Entries returned by the feed source, before the per-run cap
    pub fetched: usize,
    /// Entries that entered the pipeline
    pub attempted: usize,
    /// Entries written to the store
    pub written: usize,
    pub failures: Vec<EntryFailure>,
}

/// The collaborators a run walks each entry through
#[derive(Clone)]
pub struct Pipeline {
    pub source: Arc<dyn FeedSource>,
    pub extractor: Arc<dyn ArticleExtractor>,
    pub summarizer: Arc<Summarizer>,
    pub store: Arc<dyn ArticleStore>,
}

impl Pipeline {
    /// Extract, summarize and store one entry
    async fn process_entry(&self, entry: &FeedEntry) -> std::result::Result<(), (Stage, Error)> {
        let content = self
            .extractor
            .extract(&entry.url)
            .await
            .map_err(|e| (Stage::Extract, e))?;

        tracing::info!("Starting summarization for: {}", entry.title);
        let summary_text = self
            .summarizer
            .summarize(&content.raw_text)
            .await
            .map_err(|e| (Stage::Summarize, e))?;

        let summary = Summary::new(entry, summary_text);
        tracing::info!("Summary for '{}': {}", entry.title, summary.preview(100));

        self.store
            .write(&summary)
            .await
            .map_err(|e| (Stage::Store, e))
    }
}

/// Fetch the feed and push up to `max_articles` entries through the pipeline
///
/// Fails only when the feed itself cannot be fetched; entry failures are
/// logged and collected in the report.
pub async fn process_feed(pipeline: &Pipeline, feed_url: &str, max_articles: usize) -> Result<RunReport> {
    let entries = pipeline.source.fetch_entries(feed_url, max_articles).await?;

    let mut report = RunReport {
        fetched: entries.len(),
        ..RunReport::default()
    };

    if entries.is_empty() {
        tracing::warn!("No entries found in feed: {}", feed_url);
        return Ok(report);
    }

    let total = entries.len().min(max_articles);
    for (i, entry) in entries.iter().take(max_articles).enumerate() {
        tracing::info!("Processing article {}/{}: \"{}\" ({})", i + 1, total, entry.title, entry.url);
        report.attempted += 1;

        match pipeline.process_entry(entry).await {
            Ok(()) => report.written += 1,
            Err((stage, e)) => {
                tracing::error!(
                    url = %entry.url,
                    stage = %stage,
                    "Skipping \"{}\": {}",
                    entry.title,
                    e
                );
                report.failures.push(EntryFailure {
                    url: entry.url.clone(),
                    title: entry.title.clone(),
                    stage,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stand-ins for the pipeline seams

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::ai::AiProvider;
    use crate::feed::ArticleContent;

    pub fn entry(n: usize) -> FeedEntry {
        FeedEntry {
            title: format!("Story {}", n),
            url: format!("https://example.com/{}", n),
            published_at: None,
        }
    }

    pub struct FakeSource {
        pub entries: Vec<FeedEntry>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn with_entries(count: usize) -> Self {
            Self {
                entries: (1..=count).map(entry).collect(),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl FeedSource for FakeSource {
        async fn fetch_entries(&self, _url: &str, _limit: usize) -> Result<Vec<FeedEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Fetch("feed is down".to_string()));
            }
            // Ignores the limit so the runner's own cap is exercised
            Ok(self.entries.clone())
        }
    }

    #[derive(Default)]
    pub struct FakeExtractor {
        pub failing: HashSet<String>,
        pub empty: HashSet<String>,
        pub delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl ArticleExtractor for FakeExtractor {
        async fn extract(&self, url: &str) -> Result<ArticleContent> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(url) {
                return Err(Error::Extraction(format!("HTTP 404 for URL: {}", url)));
            }
            let raw_text = if self.empty.contains(url) {
                String::new()
            } else {
                format!("Full text of {}", url)
            };
            Ok(ArticleContent { url: url.to_string(), raw_text })
        }
    }

    #[derive(Default)]
    pub struct FakeProvider {
        pub inputs: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl AiProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn summarize(&self, content: &str) -> Result<String> {
            self.inputs.lock().unwrap().push(content.to_string());
            Ok(format!("Summary: {}", content))
        }
    }

    #[derive(Default)]
    pub struct FakeStore {
        pub failing: HashSet<String>,
        pub written: Mutex<Vec<Summary>>,
    }

    impl FakeStore {
        pub fn written_urls(&self) -> Vec<String> {
            self.written.lock().unwrap().iter().map(|s| s.url.clone()).collect()
        }
    }

    #[async_trait::async_trait]
    impl ArticleStore for FakeStore {
        async fn write(&self, summary: &Summary) -> Result<()> {
            if self.failing.contains(&summary.url) {
                return Err(Error::StoreWrite("Notion API returned HTTP 429".to_string()));
            }
            self.written.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    pub struct Fakes {
        pub source: Arc<FakeSource>,
        pub extractor: Arc<FakeExtractor>,
        pub provider: Arc<FakeProvider>,
        pub store: Arc<FakeStore>,
    }

    impl Fakes {
        pub fn new(source: FakeSource, extractor: FakeExtractor, store: FakeStore) -> Self {
            Self {
                source: Arc::new(source),
                extractor: Arc::new(extractor),
                provider: Arc::new(FakeProvider::default()),
                store: Arc::new(store),
            }
        }

        pub fn pipeline(&self) -> Pipeline {
            Pipeline {
                source: self.source.clone(),
                extractor: self.extractor.clone(),
                summarizer: Arc::new(Summarizer::with_provider(self.provider.clone())),
                store: self.store.clone(),
            }
        }

        pub fn summarized(&self) -> usize {
            self.provider.inputs.lock().unwrap().len()
        }
    }

    pub fn urls(ns: &[usize]) -> Vec<String> {
        ns.iter().map(|n| entry(*n).url).collect()
    }
}
