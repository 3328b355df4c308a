//! RSS aggregation for gator.
//!
//! Fetching, ingestion and the background aggregation loop, plus the store
//! interfaces they run against.

pub mod aggregator;
pub mod fetcher;
pub mod ingest;
pub mod repository;
pub mod store;
pub mod types;

pub use aggregator::{Aggregator, AggregatorHandle, CycleOutcome};
pub use fetcher::{parse_document, validate_url, FeedSource, RssFetcher};
pub use ingest::{ingest, IngestError};
pub use repository::{FeedRepository, PostRepository};
pub use store::{FeedStore, PostStore};
pub use types::{
    Feed, FeedDocument, FeedItem, IngestReport, InsertOutcome, NewFeed, NewPost, Post,
};
