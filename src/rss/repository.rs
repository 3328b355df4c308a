//! RSS repositories for gator.
//!
//! sqlx implementations of [`FeedStore`] and [`PostStore`], plus the read
//! helpers used by tooling and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::store::{FeedStore, PostStore};
use super::types::{Feed, InsertOutcome, NewFeed, NewPost, Post};
use crate::datetime::{format_timestamp, parse_timestamp};
use crate::db::DbPool;
use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, title, url, description, published_at, feed_id, created_at, updated_at";

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| StoreError::InvalidData(format!("{field} {value:?}: {e}")))
}

/// Row type for feed from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    last_fetched_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FeedRow> for Feed {
    type Error = StoreError;

    fn try_from(row: FeedRow) -> Result<Self> {
        Ok(Feed {
            id: parse_uuid("feed id", &row.id)?,
            name: row.name,
            url: row.url,
            user_id: parse_uuid("user id", &row.user_id)?,
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_timestamp(&s)),
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Row type for post from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: String,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: parse_uuid("post id", &row.id)?,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.and_then(|s| parse_timestamp(&s)),
            feed_id: parse_uuid("feed id", &row.feed_id)?,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Repository for feed operations.
#[derive(Clone)]
pub struct FeedRepository {
    pool: DbPool,
}

impl FeedRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Register a new feed.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let id = Uuid::new_v4();
        let now = format_timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.to_string())
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// List all feeds in registration order.
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Feed::try_from).collect()
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl FeedStore for FeedRepository {
    async fn select_stale_feed(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let stamp = format_timestamp(at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = $1, updated_at = $2 WHERE id = $3")
                .bind(&stamp)
                .bind(&stamp)
                .bind(feed_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("feed {feed_id}")));
        }
        Ok(())
    }
}

/// Repository for post operations.
#[derive(Clone)]
pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE url = $1");
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// List posts of a feed, newest publication first (undated last).
    pub async fn list_by_feed(&self, feed_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE feed_id = $1
            ORDER BY published_at DESC NULLS LAST, url ASC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(feed_id.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    /// Count all posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Count posts of a feed.
    pub async fn count_by_feed(&self, feed_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id.to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at.map(format_timestamp))
        .bind(post.feed_id.to_string())
        .bind(format_timestamp(post.created_at))
        .bind(format_timestamp(post.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("Post with URL {} already exists", post.url);
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database) -> Uuid {
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("testuser")).await.unwrap().id
    }

    async fn create_test_feed(db: &Database, user_id: Uuid, url: &str) -> Feed {
        let repo = FeedRepository::new(db.pool());
        repo.create(&NewFeed::new("Test Feed", url, user_id))
            .await
            .unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;

        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        assert_eq!(feed.name, "Test Feed");
        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.never_fetched());
    }

    #[tokio::test]
    async fn test_feed_url_is_unique() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let repo = FeedRepository::new(db.pool());

        create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let result = repo
            .create(&NewFeed::new("Again", "https://example.com/feed.xml", user_id))
            .await;
        assert!(result.is_err());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_feed_by_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let repo = FeedRepository::new(db.pool());

        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let found = repo
            .get_by_url("https://example.com/feed.xml")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, feed.id);
        assert!(repo.get_by_url("https://other.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_select_stale_feed_empty() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());
        assert!(repo.select_stale_feed().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_select_stale_feed_prefers_never_fetched() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let repo = FeedRepository::new(db.pool());

        let a = create_test_feed(&db, user_id, "https://a.example.com/rss").await;
        let b = create_test_feed(&db, user_id, "https://b.example.com/rss").await;

        repo.mark_fetched(a.id, t0()).await.unwrap();

        let next = repo.select_stale_feed().await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_select_stale_feed_oldest_first() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let repo = FeedRepository::new(db.pool());

        let a = create_test_feed(&db, user_id, "https://a.example.com/rss").await;
        let b = create_test_feed(&db, user_id, "https://b.example.com/rss").await;
        let c = create_test_feed(&db, user_id, "https://c.example.com/rss").await;

        repo.mark_fetched(a.id, t0() + Duration::minutes(2)).await.unwrap();
        repo.mark_fetched(b.id, t0()).await.unwrap();
        repo.mark_fetched(c.id, t0() + Duration::minutes(1)).await.unwrap();

        let next = repo.select_stale_feed().await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_mark_fetched_sets_timestamp() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let repo = FeedRepository::new(db.pool());

        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        repo.mark_fetched(feed.id, t0()).await.unwrap();

        let updated = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(updated.last_fetched_at, Some(t0()));
        assert_eq!(updated.updated_at, t0());
    }

    #[tokio::test]
    async fn test_mark_fetched_missing_feed() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        let result = repo.mark_fetched(Uuid::new_v4(), t0()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_post() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let repo = PostRepository::new(db.pool());

        let published = Utc.with_ymd_and_hms(2024, 12, 31, 8, 0, 0).unwrap();
        let post = NewPost::new(feed.id, "First", "https://example.com/1", t0())
            .with_description("Summary")
            .with_published_at(Some(published));

        assert_eq!(
            repo.insert_post(&post).await.unwrap(),
            InsertOutcome::Inserted
        );

        let stored = repo
            .get_by_url("https://example.com/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, post.id);
        assert_eq!(stored.title, "First");
        assert_eq!(stored.description, Some("Summary".to_string()));
        assert_eq!(stored.published_at, Some(published));
        assert_eq!(stored.feed_id, feed.id);
        assert_eq!(stored.created_at, t0());
    }

    #[tokio::test]
    async fn test_insert_duplicate_url_keeps_original() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let repo = PostRepository::new(db.pool());

        let original = NewPost::new(feed.id, "Original", "https://example.com/1", t0());
        repo.insert_post(&original).await.unwrap();

        let later = t0() + Duration::hours(1);
        let again = NewPost::new(feed.id, "Changed title", "https://example.com/1", later)
            .with_description("New description");
        assert_eq!(
            repo.insert_post(&again).await.unwrap(),
            InsertOutcome::Duplicate
        );

        let stored = repo
            .get_by_url("https://example.com/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.title, "Original");
        assert!(stored.description.is_none());
        assert_eq!(stored.updated_at, t0());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_post_for_missing_feed_is_error() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        let post = NewPost::new(Uuid::new_v4(), "Orphan", "https://example.com/1", t0());
        let result = repo.insert_post(&post).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_and_count_by_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db).await;
        let a = create_test_feed(&db, user_id, "https://a.example.com/rss").await;
        let b = create_test_feed(&db, user_id, "https://b.example.com/rss").await;
        let repo = PostRepository::new(db.pool());

        for i in 1..=5 {
            let post = NewPost::new(a.id, format!("A{i}"), format!("https://a.example.com/{i}"), t0())
                .with_published_at(Some(t0() - Duration::days(i)));
            repo.insert_post(&post).await.unwrap();
        }
        let post = NewPost::new(b.id, "B1", "https://b.example.com/1", t0());
        repo.insert_post(&post).await.unwrap();

        assert_eq!(repo.count_by_feed(a.id).await.unwrap(), 5);
        assert_eq!(repo.count_by_feed(b.id).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 6);

        let page = repo.list_by_feed(a.id, 3, 0).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].title, "A1");
        assert_eq!(page[2].title, "A3");

        let page2 = repo.list_by_feed(a.id, 3, 3).await.unwrap();
        assert_eq!(page2.len(), 2);
    }
}
