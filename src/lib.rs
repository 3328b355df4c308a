//! gator - RSS feed aggregator
//!
//! Periodically fetches registered RSS feeds, one per tick, and stores their
//! items as posts.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;

pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{FetchError, GatorError, Result, StoreError};
pub use rss::{
    Aggregator, AggregatorHandle, CycleOutcome, FeedRepository, PostRepository, RssFetcher,
};
