//! Post repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::post::{DeletedPost, Post, PostWithImages},
    ownership::{OwnershipError, Resource, ensure_owner},
};

#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, caption: &str) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, caption)
            VALUES ($1, $2)
            RETURNING id, user_id, caption, created_at
            "#,
        )
        .bind(user_id)
        .bind(caption)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Posts of a user with their image URLs, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PostWithImages>> {
        let posts = sqlx::query_as::<_, PostWithImages>(
            r#"
            SELECT p.id, p.user_id, p.caption, p.created_at,
                   COALESCE(
                       array_agg(i.url ORDER BY i.created_at, i.id) FILTER (WHERE i.id IS NOT NULL),
                       '{}'
                   ) AS image_urls
            FROM posts p
            LEFT JOIN images i ON i.post_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Delete a post if `actor` wrote it; images, likes and comments cascade
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<DeletedPost, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        ensure_owner(owner, actor, Resource::Post)?;

        let image_urls: Vec<String> =
            sqlx::query_scalar("SELECT url FROM images WHERE post_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let post = sqlx::query_as::<_, Post>(
            "DELETE FROM posts WHERE id = $1 RETURNING id, user_id, caption, created_at",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DeletedPost { post, image_urls })
    }
}
