//! Service update repository

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::mods::{insert_mods, lock_owned_car};
use crate::{
    models::garage::{NewMod, ServiceUpdate, ServiceUpdateWithMods},
    ownership::{OwnershipError, Resource, ensure_owner},
};

#[derive(Clone)]
pub struct ServiceUpdateRepository {
    pool: PgPool,
}

impl ServiceUpdateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log a service update with its mods in one transaction
    pub async fn create(
        &self,
        actor: Uuid,
        car_id: Uuid,
        description: &str,
        mods: &[NewMod],
    ) -> Result<ServiceUpdateWithMods, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        lock_owned_car(&mut *tx, car_id, actor).await?;

        let update = sqlx::query_as::<_, ServiceUpdate>(
            r#"
            INSERT INTO service_updates (car_id, description)
            VALUES ($1, $2)
            RETURNING id, car_id, description, created_at
            "#,
        )
        .bind(car_id)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        let mods = insert_mods(&mut *tx, update.id, car_id, mods).await?;

        tx.commit().await?;
        Ok(ServiceUpdateWithMods { update, mods })
    }

    /// Service updates of a car, newest first
    pub async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<ServiceUpdate>> {
        let updates = sqlx::query_as::<_, ServiceUpdate>(
            r#"
            SELECT id, car_id, description, created_at
            FROM service_updates
            WHERE car_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(updates)
    }

    /// Delete a service update if `actor` owns its car; its mods cascade
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<ServiceUpdate, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT c.user_id
            FROM service_updates s
            JOIN cars c ON c.id = s.car_id
            WHERE s.id = $1
            FOR UPDATE OF s
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        ensure_owner(owner, actor, Resource::ServiceUpdate)?;

        let update = sqlx::query_as::<_, ServiceUpdate>(
            "DELETE FROM service_updates WHERE id = $1 RETURNING id, car_id, description, created_at",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(update)
    }
}
