//! Car repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::contains_pattern;
use crate::{
    models::car::{Car, CarSearch, CarWithOwner, CreateCarRequest, DeletedCar, UpdateCarRequest},
    ownership::{OwnershipError, Resource, ensure_owner},
};

const MAX_SEARCH_RESULTS: i64 = 50;

/// Car after an update, with the photo URL it no longer references
#[derive(Debug, Clone)]
pub struct CarUpdate {
    pub car: Car,
    pub replaced_url: Option<String>,
}

#[derive(Clone)]
pub struct CarRepository {
    pool: PgPool,
}

impl CarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a car to `user_id`'s garage
    pub async fn create(&self, user_id: Uuid, payload: &CreateCarRequest) -> Result<Car> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (user_id, make, model, year, url, filename)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, make, model, year, url, filename, created_at
            "#,
        )
        .bind(user_id)
        .bind(payload.make.trim())
        .bind(payload.model.trim())
        .bind(payload.year)
        .bind(payload.url.as_deref())
        .bind(payload.filename.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(car)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<CarWithOwner>> {
        let car = sqlx::query_as::<_, CarWithOwner>(
            r#"
            SELECT c.id, c.user_id, c.make, c.model, c.year, c.url, c.filename,
                   c.created_at, u.username AS owner_username
            FROM cars c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(car)
    }

    /// Cars matching every given filter; make and model match as substrings
    pub async fn search(&self, filters: &CarSearch) -> Result<Vec<CarWithOwner>> {
        let cars = sqlx::query_as::<_, CarWithOwner>(
            r#"
            SELECT c.id, c.user_id, c.make, c.model, c.year, c.url, c.filename,
                   c.created_at, u.username AS owner_username
            FROM cars c
            JOIN users u ON u.id = c.user_id
            WHERE ($1::text IS NULL OR c.make ILIKE $1)
              AND ($2::text IS NULL OR c.model ILIKE $2)
              AND ($3::int IS NULL OR c.year = $3)
            ORDER BY c.year DESC, c.created_at DESC
            LIMIT $4
            "#,
        )
        .bind(filters.make.as_deref().map(contains_pattern))
        .bind(filters.model.as_deref().map(contains_pattern))
        .bind(filters.year)
        .bind(MAX_SEARCH_RESULTS)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }

    /// Garage of a user, newest model year first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, user_id, make, model, year, url, filename, created_at
            FROM cars
            WHERE user_id = $1
            ORDER BY year DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }

    /// Apply a partial update if `actor` owns the car
    pub async fn update(
        &self,
        id: Uuid,
        actor: Uuid,
        patch: &UpdateCarRequest,
    ) -> Result<CarUpdate, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(Uuid, Option<String>)> =
            sqlx::query_as("SELECT user_id, url FROM cars WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        ensure_owner(current.as_ref().map(|(owner, _)| *owner), actor, Resource::Car)?;
        let previous_url = current.and_then(|(_, url)| url);

        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
            SET make = COALESCE($2, make),
                model = COALESCE($3, model),
                year = COALESCE($4, year),
                url = CASE WHEN $5 THEN $6 ELSE url END,
                filename = CASE WHEN $7 THEN $8 ELSE filename END
            WHERE id = $1
            RETURNING id, user_id, make, model, year, url, filename, created_at
            "#,
        )
        .bind(id)
        .bind(patch.make.as_deref().map(str::trim))
        .bind(patch.model.as_deref().map(str::trim))
        .bind(patch.year)
        .bind(patch.url.is_some())
        .bind(patch.url.clone().flatten())
        .bind(patch.filename.is_some())
        .bind(patch.filename.clone().flatten())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced_url = previous_url.filter(|old| car.url.as_deref() != Some(old.as_str()));
        Ok(CarUpdate { car, replaced_url })
    }

    /// Delete a car if `actor` owns it; updates, mods and images cascade
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<DeletedCar, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM cars WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        ensure_owner(owner, actor, Resource::Car)?;

        let image_urls: Vec<String> = sqlx::query_scalar("SELECT url FROM images WHERE car_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let mut deleted = sqlx::query_as::<_, DeletedCar>(
            "DELETE FROM cars WHERE id = $1 RETURNING id, filename, url",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        deleted.image_urls = image_urls;
        Ok(deleted)
    }
}
