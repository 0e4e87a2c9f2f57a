use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Database, millis_to_rfc3339, now_millis};
use crate::{content::BlogPost, error::ServiceError};

const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct CommentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Identity supplied by the client alongside a new comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment<'a> {
    pub post: &'a BlogPost,
    pub content: &'a str,
    pub parent_id: Option<&'a str>,
    pub author: CommentAuthor,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub blog_id: String,
    pub user_id: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub user: CommentUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Comment>>,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: String,
    content: String,
    blog_id: String,
    user_id: String,
    parent_id: Option<String>,
    created_at: i64,
    updated_at: i64,
    user_name: String,
    user_email: String,
    user_avatar: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            user: CommentUser {
                id: row.user_id.clone(),
                name: row.user_name,
                email: row.user_email,
                avatar: row.user_avatar,
            },
            id: row.id,
            content: row.content,
            blog_id: row.blog_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            created_at: millis_to_rfc3339(row.created_at),
            updated_at: millis_to_rfc3339(row.updated_at),
            replies: None,
        }
    }
}

const SELECT_COMMENTS: &str = r#"
    SELECT
        c.id, c.content, c.blog_id, c.user_id, c.parent_id, c.created_at, c.updated_at,
        u.name AS user_name, u.email AS user_email, u.avatar AS user_avatar
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

impl Database {
    /// Finds the user by id, then by email (adopting the new id), and creates
    /// it otherwise. Non-empty details replace the stored ones.
    pub async fn upsert_user(&self, author: &CommentAuthor) -> Result<CommentUser, ServiceError> {
        let email = non_empty(author.email.as_deref());
        let name = non_empty(author.name.as_deref());
        let avatar = non_empty(author.avatar.as_deref());
        let now = now_millis();

        let mut tx = self.pool().begin().await?;

        let matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(&author.id)
            .fetch_one(&mut *tx)
            .await?;
        let mut exists = matches > 0;

        if !exists && let Some(email) = email {
            let rekeyed = sqlx::query("UPDATE users SET id = ?, updated_at = ? WHERE email = ?")
                .bind(&author.id)
                .bind(now)
                .bind(email)
                .execute(&mut *tx)
                .await?;
            exists = rekeyed.rows_affected() > 0;
        }

        if exists {
            sqlx::query(
                r#"
                UPDATE users
                SET email = COALESCE(?, email),
                    name = COALESCE(?, name),
                    avatar = COALESCE(?, avatar),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(email)
            .bind(name)
            .bind(avatar)
            .bind(now)
            .bind(&author.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO users (id, email, name, avatar, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&author.id)
            .bind(email.unwrap_or_default())
            .bind(name.unwrap_or(ANONYMOUS))
            .bind(avatar.unwrap_or_default())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let user = sqlx::query_as::<_, CommentUser>(
            "SELECT id, name, email, avatar FROM users WHERE id = ?",
        )
        .bind(&author.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Replies always hang off a top-level comment of the same post; a reply
    /// to a reply joins its thread.
    pub async fn create_comment(&self, comment: NewComment<'_>) -> Result<Comment, ServiceError> {
        let blog_id = self.ensure_blog_post(comment.post).await?;
        let parent_id = match non_empty(comment.parent_id) {
            Some(parent_id) => Some(self.thread_root(&blog_id, parent_id).await?),
            None => None,
        };
        let user = self.upsert_user(&comment.author).await?;

        let id = Uuid::new_v4().to_string();
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO comments (id, content, blog_id, user_id, parent_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(comment.content)
        .bind(&blog_id)
        .bind(&user.id)
        .bind(parent_id.as_deref())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(Comment {
            id,
            content: comment.content.to_string(),
            blog_id,
            user_id: user.id.clone(),
            parent_id,
            created_at: millis_to_rfc3339(now),
            updated_at: millis_to_rfc3339(now),
            user,
            replies: None,
        })
    }

    /// Top-level comments newest first, each carrying its replies oldest first.
    pub async fn comments_for(&self, post: &BlogPost) -> Result<Vec<Comment>, ServiceError> {
        let blog_id = self.ensure_blog_post(post).await?;
        let statement =
            format!("{SELECT_COMMENTS} WHERE c.blog_id = ? ORDER BY c.created_at ASC, c.rowid ASC");
        let rows = sqlx::query_as::<_, CommentRow>(&statement)
            .bind(&blog_id)
            .fetch_all(self.pool())
            .await?;

        let mut threads: Vec<Comment> = Vec::new();
        let mut replies: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in rows {
            let comment = Comment::from(row);
            match comment.parent_id.clone() {
                Some(parent_id) => replies.entry(parent_id).or_default().push(comment),
                None => threads.push(comment),
            }
        }

        threads.reverse();
        for thread in &mut threads {
            thread.replies = Some(replies.remove(&thread.id).unwrap_or_default());
        }
        Ok(threads)
    }

    async fn thread_root(&self, blog_id: &str, parent_id: &str) -> Result<String, ServiceError> {
        let parent: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT blog_id, parent_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(self.pool())
                .await?;

        match parent {
            Some((parent_blog_id, grandparent)) if parent_blog_id == blog_id => {
                Ok(grandparent.unwrap_or_else(|| parent_id.to_string()))
            }
            _ => Err(ServiceError::BadRequest(
                "Parent comment not found".to_string(),
            )),
        }
    }
}
