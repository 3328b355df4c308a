//! Background feed aggregator.
//!
//! One feed per tick: the stalest feed is stamped, fetched and ingested. The
//! loop keeps running through per-feed failures and stops when signalled.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, StoreError};
use crate::rss::fetcher::FeedSource;
use crate::rss::ingest::{ingest, IngestError};
use crate::rss::store::{FeedStore, PostStore};
use crate::rss::types::{Feed, FeedDocument, IngestReport};
use crate::{GatorError, Result};

/// What a single aggregation cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// No feeds are registered.
    Idle,
    /// The feed was fetched and all of its items were handled.
    Ingested { feed: Feed, report: IngestReport },
    /// The fetch failed. The feed stays stamped.
    FetchFailed { feed: Feed, error: FetchError },
    /// A store failure stopped ingestion part-way through the document.
    IngestFailed { feed: Feed, error: IngestError },
    /// Selecting or stamping the feed failed. Nothing was fetched.
    StoreFailed(StoreError),
    /// The fetch was abandoned because the cycle was cancelled. The feed stays
    /// stamped.
    Cancelled { feed: Feed },
}

impl CycleOutcome {
    fn log(&self) {
        match self {
            CycleOutcome::Idle => debug!("No feeds to fetch"),
            CycleOutcome::Ingested { feed, report } => info!(
                "Collected feed {} ({}): {} new, {} duplicate, {} undated, {} skipped",
                feed.name, feed.url, report.inserted, report.duplicates, report.undated, report.skipped
            ),
            CycleOutcome::FetchFailed { feed, error } => {
                warn!("Failed to fetch feed {} ({}): {}", feed.name, feed.url, error)
            }
            CycleOutcome::IngestFailed { feed, error } => error!(
                "Failed to store posts of feed {} ({}): {} ({} item(s) not stored)",
                feed.name, feed.url, error, error.report.failed
            ),
            CycleOutcome::StoreFailed(e) => error!("Failed to claim next feed: {}", e),
            CycleOutcome::Cancelled { feed } => {
                info!("Shutdown requested while fetching {}", feed.url)
            }
        }
    }
}

/// Feed aggregation scheduler.
pub struct Aggregator<F, P, S> {
    feeds: F,
    posts: P,
    source: S,
}

impl<F, P, S> Aggregator<F, P, S>
where
    F: FeedStore,
    P: PostStore,
    S: FeedSource,
{
    /// Create an aggregator over the given stores and feed source.
    pub fn new(feeds: F, posts: P, source: S) -> Self {
        Self {
            feeds,
            posts,
            source,
        }
    }

    /// Run one cycle at `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleOutcome {
        self.run_cycle_until(now, std::future::pending()).await
    }

    /// Run one cycle at `now`, abandoning the fetch if `cancel` resolves first.
    ///
    /// Cancellation only affects the fetch. Once a document is fetched it is
    /// ingested completely.
    pub async fn run_cycle_until<C>(&self, now: DateTime<Utc>, cancel: C) -> CycleOutcome
    where
        C: Future<Output = ()>,
    {
        let feed = match self.claim_feed(now).await {
            Ok(Some(feed)) => feed,
            Ok(None) => return CycleOutcome::Idle,
            Err(e) => return CycleOutcome::StoreFailed(e),
        };

        debug!("Fetching feed {} ({})", feed.name, feed.url);
        let url = feed.url.clone();
        let fetched = tokio::select! {
            result = self.source.fetch(&url) => result,
            _ = cancel => return CycleOutcome::Cancelled { feed },
        };

        self.finish(feed, fetched, now).await
    }

    /// Run cycles every `interval` until `shutdown` becomes `true` or its
    /// sender is dropped.
    ///
    /// The first cycle runs immediately. A fetch in flight when shutdown is
    /// requested is abandoned; ingestion of a fetched document always
    /// completes.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        validate_interval(interval)?;
        info!("Collecting feeds every {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            let outcome = self
                .run_cycle_until(Utc::now(), shutdown_requested(&mut shutdown))
                .await;
            outcome.log();
            if matches!(outcome, CycleOutcome::Cancelled { .. }) {
                break;
            }
        }

        info!("Aggregator stopped");
        Ok(())
    }

    /// Select the stalest feed and stamp it as fetched at `now`.
    async fn claim_feed(&self, now: DateTime<Utc>) -> std::result::Result<Option<Feed>, StoreError> {
        let Some(mut feed) = self.feeds.select_stale_feed().await? else {
            return Ok(None);
        };
        self.feeds.mark_fetched(feed.id, now).await?;
        feed.last_fetched_at = Some(now);
        Ok(Some(feed))
    }

    async fn finish(
        &self,
        feed: Feed,
        fetched: std::result::Result<FeedDocument, FetchError>,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let document = match fetched {
            Ok(document) => document,
            Err(error) => return CycleOutcome::FetchFailed { feed, error },
        };

        match ingest(&self.posts, feed.id, &document, now).await {
            Ok(report) => CycleOutcome::Ingested { feed, report },
            Err(error) => CycleOutcome::IngestFailed { feed, error },
        }
    }
}

impl<F, P, S> Aggregator<F, P, S>
where
    F: FeedStore + 'static,
    P: PostStore + 'static,
    S: FeedSource + 'static,
{
    /// Start the aggregation loop as a background task.
    pub fn spawn(self, interval: Duration) -> Result<AggregatorHandle> {
        validate_interval(interval)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(interval, shutdown_rx));

        Ok(AggregatorHandle {
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle to a spawned aggregation loop. Dropping it also stops the loop.
pub struct AggregatorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl AggregatorHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await?
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(GatorError::Config("interval must be positive".to_string()));
    }
    Ok(())
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
