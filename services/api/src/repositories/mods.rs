//! Modification repository

use anyhow::Result;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    models::garage::{Mod, NewMod},
    ownership::{OwnershipError, Resource, ensure_owner},
};

/// Insert mods under a service update on the given connection
pub(crate) async fn insert_mods(
    conn: &mut PgConnection,
    service_update_id: Uuid,
    car_id: Uuid,
    mods: &[NewMod],
) -> Result<Vec<Mod>, sqlx::Error> {
    let mut created = Vec::with_capacity(mods.len());

    for new_mod in mods {
        let row = sqlx::query_as::<_, Mod>(
            r#"
            INSERT INTO mods (service_update_id, car_id, name, mod_type, mileage, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, service_update_id, car_id, name, mod_type, mileage, description
            "#,
        )
        .bind(service_update_id)
        .bind(car_id)
        .bind(&new_mod.name)
        .bind(&new_mod.mod_type)
        .bind(new_mod.mileage)
        .bind(&new_mod.description)
        .fetch_one(&mut *conn)
        .await?;

        created.push(row);
    }

    Ok(created)
}

/// Lock a car and check `actor` owns it
pub(crate) async fn lock_owned_car(
    conn: &mut PgConnection,
    car_id: Uuid,
    actor: Uuid,
) -> Result<(), OwnershipError> {
    let owner: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM cars WHERE id = $1 FOR UPDATE")
            .bind(car_id)
            .fetch_optional(&mut *conn)
            .await?;

    ensure_owner(owner, actor, Resource::Car)
}

#[derive(Clone)]
pub struct ModRepository {
    pool: PgPool,
}

impl ModRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add mods to an existing service update of a car owned by `actor`
    pub async fn create(
        &self,
        actor: Uuid,
        car_id: Uuid,
        service_update_id: Uuid,
        mods: &[NewMod],
    ) -> Result<Vec<Mod>, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        lock_owned_car(&mut *tx, car_id, actor).await?;

        let update_car: Option<Uuid> =
            sqlx::query_scalar("SELECT car_id FROM service_updates WHERE id = $1")
                .bind(service_update_id)
                .fetch_optional(&mut *tx)
                .await?;

        if update_car != Some(car_id) {
            return Err(OwnershipError::NotFound(Resource::ServiceUpdate));
        }

        let created = insert_mods(&mut *tx, service_update_id, car_id, mods).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Mods of a car, highest mileage first
    pub async fn list_by_car(&self, car_id: Uuid) -> Result<Vec<Mod>> {
        let mods = sqlx::query_as::<_, Mod>(
            r#"
            SELECT id, service_update_id, car_id, name, mod_type, mileage, description
            FROM mods
            WHERE car_id = $1
            ORDER BY mileage DESC, name
            "#,
        )
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(mods)
    }

    /// Delete a mod if `actor` owns its car
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<Mod, OwnershipError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT c.user_id
            FROM mods m
            JOIN cars c ON c.id = m.car_id
            WHERE m.id = $1
            FOR UPDATE OF m
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        ensure_owner(owner, actor, Resource::Mod)?;

        let removed = sqlx::query_as::<_, Mod>(
            r#"
            DELETE FROM mods
            WHERE id = $1
            RETURNING id, service_update_id, car_id, name, mod_type, mileage, description
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }
}
