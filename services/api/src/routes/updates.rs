//! Service update handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use super::{JsonBody, PathParam};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::garage::{CreateServiceUpdateRequest, normalize_mods},
};

/// Log a service update together with the mods it installed
pub async fn create_update(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CreateServiceUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let mods = normalize_mods(payload.mods).map_err(ApiError::BadRequest)?;

    let created = state
        .update_repository
        .create(user.id, payload.car_id, &payload.description, &mods)
        .await?;

    info!(
        "Logged service update {} on car {} with {} mods",
        created.update.id,
        created.update.car_id,
        created.mods.len()
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Service updates of a car, newest first
pub async fn get_car_updates(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(car_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let updates = state
        .update_repository
        .list_by_car(car_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get service updates", e))?;

    Ok(Json(updates))
}

pub async fn delete_update(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(update_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let removed = state.update_repository.delete(update_id, user.id).await?;
    Ok(Json(removed))
}
