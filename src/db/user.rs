//! Feed owner records.
//!
//! Account management is handled elsewhere; the aggregator only needs owners
//! to exist so that feeds can reference them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::datetime::{format_timestamp, parse_timestamp};
use crate::db::DbPool;
use crate::error::StoreError;

/// A feed owner.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| StoreError::InvalidData(format!("user id {:?}: {e}", row.id)))?,
            name: row.name,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Repository for feed owners.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Create a user.
    pub async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO users (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(id.to_string())
            .bind(&user.name)
            .bind(format_timestamp(now))
            .bind(format_timestamp(now))
            .execute(&self.pool)
            .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo.create(&NewUser::new("kahya")).await.unwrap();
        assert_eq!(user.name, "kahya");

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[tokio::test]
    async fn test_duplicate_user_name_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("kahya")).await.unwrap();
        let result = repo.create(&NewUser::new("kahya")).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
