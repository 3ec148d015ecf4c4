use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ai::Summarizer;
use crate::config::AppConfig;
use crate::extract::ContentExtractor;
use crate::feed::{build_client, FeedFetcher};
use crate::store::NotionWriter;
use crate::Result;

use super::tasks::{process_feed, Pipeline, RunReport};

/// Whether a job run is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let sender_gone = shutdown.wait_for(|stop| *stop).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

/// Runs the feed job immediately and then on a fixed interval
pub struct JobRunner {
    config: Arc<AppConfig>,
    pipeline: Pipeline,
    state_tx: watch::Sender<JobState>,
}

impl JobRunner {
    pub fn new(config: Arc<AppConfig>, pipeline: Pipeline) -> Self {
        let (state_tx, _) = watch::channel(JobState::Idle);
        Self {
            config,
            pipeline,
            state_tx,
        }
    }

    /// Wire up the HTTP-backed collaborators described by the configuration
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self> {
        let client = build_client(config.request_timeout(), &config.sync.proxy_url)?;

        let summarizer = Summarizer::new(&config, client.clone())?;
        info!("AI summarization enabled (model: {})", summarizer.provider_name());

        let pipeline = Pipeline {
            source: Arc::new(FeedFetcher::new(client.clone())),
            extractor: Arc::new(ContentExtractor::new(client.clone())),
            summarizer: Arc::new(summarizer),
            store: Arc::new(NotionWriter::new(&config, client)?),
        };

        Ok(Self::new(config, pipeline))
    }

    /// Observe Idle/Running transitions
    pub fn subscribe_state(&self) -> watch::Receiver<JobState> {
        self.state_tx.subscribe()
    }

    /// Execute one job run
    pub async fn run_once(&self) -> Result<RunReport> {
        self.state_tx.send_replace(JobState::Running);
        info!("Job starting, feed: {}", self.config.sync.feed_url);

        let result = process_feed(
            &self.pipeline,
            &self.config.sync.feed_url,
            self.config.sync.max_articles,
        )
        .await;

        match &result {
            Ok(report) => info!(
                "Job finished: {} fetched, {} attempted, {} written, {} failed",
                report.fetched,
                report.attempted,
                report.written,
                report.failures.len()
            ),
            Err(e) => error!("Job run skipped, feed unavailable: {}", e),
        }

        self.state_tx.send_replace(JobState::Idle);
        result
    }

    /// Run the job on the configured interval until shutdown is signalled
    ///
    /// Runs never overlap: a slow run pushes the next tick back.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.schedule_interval();
        info!(
            "Scheduler started: every {} minutes, up to {} articles per run",
            self.config.sync.schedule_interval_minutes,
            self.config.sync.max_articles
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    warn!("Shutdown during a job run, abandoning the current batch");
                    break;
                }
                _ = self.run_once() => {}
            }
        }

        self.state_tx.send_replace(JobState::Idle);
        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tasks::testing::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config(max_articles: usize) -> Arc<AppConfig> {
        let mut config = AppConfig::default();
        config.sync.max_articles = max_articles;
        config.sync.schedule_interval_minutes = 10;
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_run_once_returns_to_idle() {
        let fakes = Fakes::new(FakeSource::with_entries(5), FakeExtractor::default(), FakeStore::default());
        let runner = JobRunner::new(config(3), fakes.pipeline());
        let state = runner.subscribe_state();

        let report = runner.run_once().await.unwrap();

        assert_eq!(report.written, 3);
        assert_eq!(*state.borrow(), JobState::Idle);
        assert_eq!(fakes.store.written_urls(), urls(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_run_once_reports_feed_failure() {
        let source = FakeSource {
            fail: true,
            ..FakeSource::with_entries(1)
        };
        let fakes = Fakes::new(source, FakeExtractor::default(), FakeStore::default());
        let runner = JobRunner::new(config(3), fakes.pipeline());

        assert!(runner.run_once().await.is_err());
        assert_eq!(*runner.subscribe_state().borrow(), JobState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let fakes = Fakes::new(FakeSource::with_entries(1), FakeExtractor::default(), FakeStore::default());
        let runner = Arc::new(JobRunner::new(config(3), fakes.pipeline()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(shutdown_rx).await }
        });

        // Ticks at 0, 10 and 20 minutes
        tokio::time::sleep(Duration::from_secs(20 * 60 + 30)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(fakes.source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(fakes.store.written_urls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let fakes = Fakes::new(FakeSource::with_entries(1), FakeExtractor::default(), FakeStore::default());
        let runner = JobRunner::new(config(3), fakes.pipeline());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        runner.run(shutdown_rx).await;

        assert_eq!(fakes.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_slow_run() {
        let extractor = FakeExtractor {
            delay: Some(Duration::from_secs(3600)),
            ..FakeExtractor::default()
        };
        let fakes = Fakes::new(FakeSource::with_entries(2), extractor, FakeStore::default());
        let runner = Arc::new(JobRunner::new(config(3), fakes.pipeline()));
        let state = runner.subscribe_state();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(shutdown_rx).await }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*state.borrow(), JobState::Running);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(fakes.store.written_urls().is_empty());
        assert_eq!(*state.borrow(), JobState::Idle);
    }
}
