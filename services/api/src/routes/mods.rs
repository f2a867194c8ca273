//! Modification handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{JsonBody, PathParam};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::garage::{CreateModsRequest, normalize_mods},
};

/// Add mods to an existing service update
pub async fn create_mods(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CreateModsRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(car_id), Some(service_update_id), Some(inputs)) =
        (payload.car_id, payload.service_update_id, payload.mods)
    else {
        return Err(ApiError::BadRequest(
            "car_id, su_id and mods are required".to_string(),
        ));
    };

    let mods = normalize_mods(inputs).map_err(ApiError::BadRequest)?;
    if mods.is_empty() {
        return Err(ApiError::BadRequest("No named mods provided".to_string()));
    }

    let created = state
        .mod_repository
        .create(user.id, car_id, service_update_id, &mods)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Mods of a car, highest mileage first
pub async fn get_car_mods(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(car_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mods = state
        .mod_repository
        .list_by_car(car_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get mods", e))?;

    Ok(Json(mods))
}

pub async fn delete_mod(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(mod_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let removed = state.mod_repository.delete(mod_id, user.id).await?;
    Ok(Json(removed))
}
