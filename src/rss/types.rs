//! RSS types for gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Feed URL (globally unique).
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
    /// Start time of the last fetch attempt. `None` if never fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When the feed was registered.
    pub created_at: DateTime<Utc>,
    /// When the feed record was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    /// Whether the feed has never been fetched.
    pub fn never_fetched(&self) -> bool {
        self.last_fetched_at.is_none()
    }
}

/// New feed for registration.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
}

impl NewFeed {
    /// Create a new feed registration.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A stored post. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// Item URL, unique across all posts.
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New post for insertion.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPost {
    /// Create a new post with a fresh ID, created and updated at `now`.
    pub fn new(
        feed_id: Uuid,
        title: impl Into<String>,
        url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
            feed_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description. Blank descriptions are stored as absent.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let desc = description.into();
        self.description = if desc.trim().is_empty() {
            None
        } else {
            Some(desc)
        };
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// Result of a post insert that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new post was stored.
    Inserted,
    /// A post with the same URL already exists; nothing was changed.
    Duplicate,
}

/// A fetched and decoded feed. Lives for one ingestion cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// One item of a fetched feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Raw `pubDate` text; parsed during ingestion.
    pub pub_date: String,
}

impl FeedItem {
    /// Create an item with the given title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw publication date.
    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }
}

/// Per-document ingestion counts, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// New posts stored.
    pub inserted: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items not stored because of a store failure (the failing item and
    /// every item after it).
    pub failed: usize,
    /// Items without a link, which cannot be deduplicated.
    pub skipped: usize,
    /// Stored posts whose `pubDate` could not be parsed.
    pub undated: usize,
}

impl IngestReport {
    /// Number of items accounted for.
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.failed + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_feed() {
        let user_id = Uuid::new_v4();
        let feed = NewFeed::new("Hacker News", "https://news.ycombinator.com/rss", user_id);
        assert_eq!(feed.name, "Hacker News");
        assert_eq!(feed.url, "https://news.ycombinator.com/rss");
        assert_eq!(feed.user_id, user_id);
    }

    #[test]
    fn test_new_post_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let feed_id = Uuid::new_v4();
        let post = NewPost::new(feed_id, "Title", "https://example.com/1", now);
        assert_eq!(post.feed_id, feed_id);
        assert_eq!(post.created_at, now);
        assert_eq!(post.updated_at, now);
        assert!(post.description.is_none());
        assert!(post.published_at.is_none());
    }

    #[test]
    fn test_new_post_ids_are_unique() {
        let now = Utc::now();
        let a = NewPost::new(Uuid::nil(), "A", "https://example.com/a", now);
        let b = NewPost::new(Uuid::nil(), "B", "https://example.com/b", now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_post_blank_description_is_absent() {
        let now = Utc::now();
        let post = NewPost::new(Uuid::nil(), "A", "https://example.com/a", now).with_description("");
        assert!(post.description.is_none());

        let post = NewPost::new(Uuid::nil(), "A", "https://example.com/a", now)
            .with_description("  \n ");
        assert!(post.description.is_none());

        let post = NewPost::new(Uuid::nil(), "A", "https://example.com/a", now)
            .with_description("Summary");
        assert_eq!(post.description, Some("Summary".to_string()));
    }

    #[test]
    fn test_feed_item_builder() {
        let item = FeedItem::new("Title", "https://example.com/a")
            .with_description("Desc")
            .with_pub_date("Mon, 02 Jan 2006 15:04:05 -0700");
        assert_eq!(item.title, "Title");
        assert_eq!(item.link, "https://example.com/a");
        assert_eq!(item.description, "Desc");
        assert_eq!(item.pub_date, "Mon, 02 Jan 2006 15:04:05 -0700");
    }

    #[test]
    fn test_ingest_report_total() {
        let report = IngestReport {
            inserted: 2,
            duplicates: 3,
            failed: 1,
            skipped: 1,
            undated: 1,
        };
        assert_eq!(report.total(), 7);
    }
}
