//! Store interfaces consumed by the aggregator.
//!
//! The aggregator never touches SQL directly. It selects and stamps feeds
//! through [`FeedStore`] and inserts posts through [`PostStore`], relying on
//! the store's URL uniqueness constraint for deduplication.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::rss::types::{Feed, InsertOutcome, NewPost};

/// Feed table operations needed by the scheduler.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed with the oldest `last_fetched_at`, never-fetched feeds first.
    ///
    /// Returns `Ok(None)` when no feeds are registered.
    async fn select_stale_feed(&self) -> Result<Option<Feed>, StoreError>;

    /// Set the feed's `last_fetched_at` to `at`.
    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Post table operations needed by ingestion.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post. An existing post with the same URL is left untouched and
    /// reported as [`InsertOutcome::Duplicate`].
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome, StoreError>;
}
