use serde::Serialize;
use uuid::Uuid;

use super::{Database, now_millis};
use crate::{content::BlogPost, error::ServiceError};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, Copy)]
enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    fn table(self) -> &'static str {
        match self {
            Self::Like => "blog_likes",
            Self::Dislike => "blog_dislikes",
        }
    }
}

impl Database {
    /// Row id of the post, mirroring the rendered post into the table the
    /// first time it is referenced.
    pub async fn ensure_blog_post(&self, post: &BlogPost) -> Result<String, ServiceError> {
        let now = now_millis();
        let tags = serde_json::to_string(&post.tags)
            .map_err(|err| ServiceError::Internal(err.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO blog_posts
                (id, slug, title, excerpt, content, featured, reading_time, tags, published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(post.featured)
        .bind(post.reading_time as i64)
        .bind(tags)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id: String = sqlx::query_scalar("SELECT id FROM blog_posts WHERE slug = ?")
            .bind(&post.slug)
            .fetch_one(self.pool())
            .await?;
        Ok(id)
    }

    pub async fn like(&self, post: &BlogPost) -> Result<(), ServiceError> {
        self.react(post, Reaction::Like).await
    }

    pub async fn dislike(&self, post: &BlogPost) -> Result<(), ServiceError> {
        self.react(post, Reaction::Dislike).await
    }

    /// Unknown slugs have no reactions yet.
    pub async fn reaction_counts(&self, slug: &str) -> Result<ReactionCounts, ServiceError> {
        let blog_id: Option<String> = sqlx::query_scalar("SELECT id FROM blog_posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool())
            .await?;
        let Some(blog_id) = blog_id else {
            return Ok(ReactionCounts::default());
        };

        let (likes, dislikes): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM blog_likes WHERE blog_id = ?),
                (SELECT COUNT(*) FROM blog_dislikes WHERE blog_id = ?)
            "#,
        )
        .bind(&blog_id)
        .bind(&blog_id)
        .fetch_one(self.pool())
        .await?;

        Ok(ReactionCounts { likes, dislikes })
    }

    async fn react(&self, post: &BlogPost, reaction: Reaction) -> Result<(), ServiceError> {
        let blog_id = self.ensure_blog_post(post).await?;
        let statement = format!(
            "INSERT INTO {} (id, blog_id, created_at) VALUES (?, ?, ?)",
            reaction.table()
        );

        sqlx::query(&statement)
            .bind(Uuid::new_v4().to_string())
            .bind(blog_id)
            .bind(now_millis())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ReactionCounts;
    use crate::database::tests::{memory_database, sample_post};

    #[tokio::test]
    async fn unknown_posts_have_zero_reactions() {
        let database = memory_database().await;
        assert_eq!(
            database.reaction_counts("nope").await.unwrap(),
            ReactionCounts::default()
        );
    }

    #[tokio::test]
    async fn counts_every_reaction() {
        let database = memory_database().await;
        let post = sample_post("hello");

        database.like(&post).await.unwrap();
        database.like(&post).await.unwrap();
        database.dislike(&post).await.unwrap();

        assert_eq!(
            database.reaction_counts("hello").await.unwrap(),
            ReactionCounts {
                likes: 2,
                dislikes: 1
            }
        );
    }

    #[tokio::test]
    async fn mirrors_post_once() {
        let database = memory_database().await;
        let post = sample_post("hello");

        let first = database.ensure_blog_post(&post).await.unwrap();
        let second = database.ensure_blog_post(&post).await.unwrap();
        assert_eq!(first, second);
    }
}
