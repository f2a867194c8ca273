//! Comment repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::ReferenceError;
use crate::{
    models::comment::{Comment, CommentWithAuthor},
    ownership::{OwnershipError, Resource, ensure_owner},
};

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, ReferenceError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, text, created_at
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(ReferenceError::classify)?;

        Ok(comment)
    }

    /// Comments on a post with their authors, newest first
    pub async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.text, c.created_at,
                   u.username, u.avatar_url
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Delete a comment if `actor` wrote it
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<Comment, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        ensure_owner(owner, actor, Resource::Comment)?;

        let comment = sqlx::query_as::<_, Comment>(
            "DELETE FROM comments WHERE id = $1 RETURNING id, post_id, user_id, text, created_at",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comment)
    }
}
