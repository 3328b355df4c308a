//! Database schema and migrations for gator.
//!
//! Migrations are applied in order when the database is opened. Ids are UUID
//! text and timestamps fixed-width RFC 3339 text, so the same statements run on
//! SQLite and PostgreSQL.

/// Database migrations.
///
/// Each migration is a SQL script executed in its own transaction. The
/// schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed owners. Account management lives outside the aggregator.
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#,
    // v2: Registered feeds
    r#"
CREATE TABLE feeds (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    url              TEXT NOT NULL UNIQUE,
    user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    last_fetched_at  TEXT,                   -- NULL until the first fetch attempt
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX idx_feeds_last_fetched_at ON feeds(last_fetched_at);
"#,
    // v3: Ingested posts, deduplicated by URL
    r#"
CREATE TABLE posts (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    url           TEXT NOT NULL UNIQUE,
    description   TEXT,
    published_at  TEXT,
    feed_id       TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX idx_posts_feed_id ON posts(feed_id);
"#,
];
