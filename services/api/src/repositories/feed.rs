//! Postgres-backed feed store

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::feed::{AuthorSummary, FeedPost, FeedStore, PageQuery};

/// Reads feed posts and their counters from Postgres
#[derive(Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn feed_post(row: &PgRow) -> FeedPost {
    FeedPost {
        id: row.get("id"),
        user_id: row.get("user_id"),
        caption: row.get("caption"),
        created_at: row.get("created_at"),
        image_urls: row.get("image_urls"),
        author: AuthorSummary {
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
            avatar_filename: row.get("avatar_filename"),
        },
    }
}

impl FeedStore for PgFeedStore {
    async fn following_ids(&self, viewer: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT followee_id FROM follows WHERE follower_id = $1")
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<FeedPost>> {
        // Keyset predicate on the (created_at, id) pair served by idx_posts_feed
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.user_id, p.caption, p.created_at,
                   u.username, u.avatar_url, u.avatar_filename,
                   COALESCE(
                       (SELECT array_agg(i.url ORDER BY i.created_at, i.id)
                        FROM images i WHERE i.post_id = p.id),
                       '{}'
                   ) AS image_urls
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.created_at >= $1
              AND ($2::uuid[] IS NULL OR p.user_id = ANY($2))
              AND ($3::timestamptz IS NULL OR (p.created_at, p.id) < ($3, $4::uuid))
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $5
            "#,
        )
        .bind(query.since)
        .bind(query.authors.clone())
        .bind(query.cursor.map(|c| c.created_at))
        .bind(query.cursor.map(|c| c.post_id))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(feed_post).collect())
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Option<FeedPost>> {
        let row = sqlx::query(
            r#"
            SELECT p.id, p.user_id, p.caption, p.created_at,
                   u.username, u.avatar_url, u.avatar_filename,
                   COALESCE(
                       (SELECT array_agg(i.url ORDER BY i.created_at, i.id)
                        FROM images i WHERE i.post_id = p.id),
                       '{}'
                   ) AS image_urls
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(feed_post))
    }

    async fn like_count(&self, post_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn comment_count(&self, post_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn has_liked(&self, post_id: Uuid, viewer: Uuid) -> Result<bool> {
        let liked = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;

        Ok(liked)
    }
}
