//! Shared helpers for integration tests.
//!
//! Provides an in-memory database with a registered owner, a fetcher that may
//! reach the local mock server, and RSS fixtures.

#![allow(dead_code)]

use gator::config::AggregatorConfig;
use gator::rss::{Feed, NewFeed};
use gator::{Database, FeedRepository, NewUser, PostRepository, RssFetcher, UserRepository};
use uuid::Uuid;

/// Database plus repositories sharing one pool.
pub struct TestStore {
    pub db: Database,
    pub feeds: FeedRepository,
    pub posts: PostRepository,
    pub owner: Uuid,
}

impl TestStore {
    /// Open an in-memory database with a single owner.
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let owner = UserRepository::new(db.pool())
            .create(&NewUser::new("lane"))
            .await
            .unwrap()
            .id;
        Self {
            feeds: FeedRepository::new(db.pool()),
            posts: PostRepository::new(db.pool()),
            owner,
            db,
        }
    }

    /// Register a feed owned by the test user.
    pub async fn add_feed(&self, name: &str, url: &str) -> Feed {
        self.feeds
            .create(&NewFeed::new(name, url, self.owner))
            .await
            .unwrap()
    }
}

/// Fetcher allowed to reach the local mock server.
pub fn test_fetcher() -> RssFetcher {
    let config = AggregatorConfig {
        allow_private_hosts: true,
        connect_timeout_secs: 2,
        total_timeout_secs: 5,
        ..AggregatorConfig::default()
    };
    RssFetcher::new(&config).unwrap()
}

/// Build an RSS 2.0 document from `(title, link, pubDate)` triples.
pub fn rss_feed(title: &str, items: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n\
         <title>{title}</title>\n<link>https://example.com</link>\n\
         <description>Test feed</description>\n"
    );
    for (item_title, link, pub_date) in items {
        xml.push_str(&format!(
            "<item><title>{item_title}</title><link>{link}</link>\
             <pubDate>{pub_date}</pubDate><description>About {item_title}</description></item>\n"
        ));
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// A valid RFC 1123 date with numeric zone.
pub const PUB_DATE: &str = "Mon, 02 Jan 2006 15:04:05 -0700";
