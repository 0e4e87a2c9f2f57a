mod comments;
mod reactions;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::info;

pub use comments::{Comment, CommentAuthor, NewComment};
pub use reactions::ReactionCounts;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        name TEXT NOT NULL,
        avatar TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email) WHERE email <> ''
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id TEXT PRIMARY KEY NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        excerpt TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        featured INTEGER NOT NULL DEFAULT 0,
        reading_time INTEGER NOT NULL DEFAULT 0,
        tags TEXT NOT NULL DEFAULT '[]',
        published INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL,
        blog_id TEXT NOT NULL REFERENCES blog_posts (id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users (id) ON UPDATE CASCADE ON DELETE CASCADE,
        parent_id TEXT REFERENCES comments (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS comments_blog_id_idx ON comments (blog_id, created_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_likes (
        id TEXT PRIMARY KEY NOT NULL,
        blog_id TEXT NOT NULL REFERENCES blog_posts (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_dislikes (
        id TEXT PRIMARY KEY NOT NULL,
        blog_id TEXT NOT NULL REFERENCES blog_posts (id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    )
    "#,
];

/// Comments and reactions store. Timestamps are epoch milliseconds.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let database = Self::from_pool(pool).await?;
        info!("database ready at {database_url}");
        Ok(database)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::Database;
    use crate::content::BlogPost;

    pub(crate) async fn memory_database() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Database::from_pool(pool).await.unwrap()
    }

    pub(crate) fn sample_post(slug: &str) -> BlogPost {
        BlogPost {
            slug: slug.to_string(),
            title: format!("Post {slug}"),
            date: "2024-01-01".to_string(),
            excerpt: "excerpt".to_string(),
            content: "<p>body</p>".to_string(),
            tags: vec!["rust".to_string()],
            featured: true,
            image: None,
            reading_time: 4,
        }
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let database = memory_database().await;
        let again = Database::from_pool(database.pool().clone()).await;
        assert!(again.is_ok());
    }

    #[test]
    fn formats_millis_as_utc_timestamp() {
        assert_eq!(super::millis_to_rfc3339(1_000), "1970-01-01T00:00:01.000Z");
    }
}
