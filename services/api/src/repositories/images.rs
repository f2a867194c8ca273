//! Image repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::image::{Image, ImageParent},
    ownership::{OwnershipError, Resource, ensure_owner},
};

#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach an image to a car or post owned by `actor`
    pub async fn create(
        &self,
        actor: Uuid,
        parent: ImageParent,
        url: &str,
    ) -> Result<Image, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let (owner, resource) = match parent {
            ImageParent::Car(car_id) => (
                sqlx::query_scalar("SELECT user_id FROM cars WHERE id = $1 FOR UPDATE")
                    .bind(car_id)
                    .fetch_optional(&mut *tx)
                    .await?,
                Resource::Car,
            ),
            ImageParent::Post(post_id) => (
                sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1 FOR UPDATE")
                    .bind(post_id)
                    .fetch_optional(&mut *tx)
                    .await?,
                Resource::Post,
            ),
        };

        ensure_owner(owner, actor, resource)?;

        let (car_id, post_id) = match parent {
            ImageParent::Car(id) => (Some(id), None),
            ImageParent::Post(id) => (None, Some(id)),
        };

        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (car_id, post_id, url)
            VALUES ($1, $2, $3)
            RETURNING id, car_id, post_id, url, created_at
            "#,
        )
        .bind(car_id)
        .bind(post_id)
        .bind(url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    pub async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Image>> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, car_id, post_id, url, created_at
            FROM images
            WHERE post_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Delete an image if `actor` owns its parent car or post
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<Image, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Option<Uuid>> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(c.user_id, p.user_id)
            FROM images i
            LEFT JOIN cars c ON c.id = i.car_id
            LEFT JOIN posts p ON p.id = i.post_id
            WHERE i.id = $1
            FOR UPDATE OF i
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        ensure_owner(owner.flatten(), actor, Resource::Image)?;

        let image = sqlx::query_as::<_, Image>(
            "DELETE FROM images WHERE id = $1 RETURNING id, car_id, post_id, url, created_at",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }
}
