//! Garage handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use super::{JsonBody, PathParam, QueryParams};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::car::{CarSearchQuery, CreateCarRequest, UpdateCarRequest},
    validation::{validate_car, validate_year},
};

pub async fn create_car(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CreateCarRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_car(&payload.make, &payload.model, payload.year).map_err(ApiError::BadRequest)?;

    let car = state
        .car_repository
        .create(user.id, &payload)
        .await
        .map_err(|e| ApiError::internal("Failed to create car", e))?;

    info!("User {} added car {}", user.id, car.id);
    Ok((StatusCode::CREATED, Json(car)))
}

pub async fn get_car(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(car_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let car = state
        .car_repository
        .find_detail(car_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get car", e))?
        .ok_or_else(|| ApiError::NotFound("Car not found".to_string()))?;

    Ok(Json(car))
}

pub async fn search_cars(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<CarSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let filters = query.into_search().map_err(ApiError::BadRequest)?;

    let cars = state
        .car_repository
        .search(&filters)
        .await
        .map_err(|e| ApiError::internal("Failed to search cars", e))?;

    Ok(Json(cars))
}

/// A user's garage
pub async fn get_user_cars(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let cars = state
        .car_repository
        .list_by_user(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get cars", e))?;

    Ok(Json(cars))
}

fn validate_patch(patch: &UpdateCarRequest) -> Result<(), String> {
    if patch.is_empty() {
        return Err("No fields to update".to_string());
    }
    if patch.make.as_deref().is_some_and(|m| m.trim().is_empty()) {
        return Err("Make is required".to_string());
    }
    if patch.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
        return Err("Model is required".to_string());
    }
    if let Some(year) = patch.year {
        validate_year(year)?;
    }
    Ok(())
}

pub async fn update_car(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(car_id), _): PathParam<Uuid>,
    WithRejection(Json(payload), _): JsonBody<UpdateCarRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_patch(&payload).map_err(ApiError::BadRequest)?;

    let update = state
        .car_repository
        .update(car_id, user.id, &payload)
        .await?;

    state
        .storage
        .remove_urls(user.id, update.replaced_url.as_slice())
        .await;

    Ok(Json(update.car))
}

/// Delete a car along with its photo and image objects
pub async fn delete_car(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(car_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.car_repository.delete(car_id, user.id).await?;

    let urls: Vec<String> = deleted
        .url
        .iter()
        .chain(&deleted.image_urls)
        .cloned()
        .collect();
    state.storage.remove_urls(user.id, &urls).await;
    info!("User {} deleted car {}", user.id, car_id);

    Ok(Json(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_must_change_something_valid() {
        assert_eq!(
            validate_patch(&UpdateCarRequest::default()).unwrap_err(),
            "No fields to update"
        );

        let blank_make = UpdateCarRequest {
            make: Some(" ".into()),
            ..Default::default()
        };
        assert!(validate_patch(&blank_make).is_err());

        let ancient = UpdateCarRequest {
            year: Some(1700),
            ..Default::default()
        };
        assert!(validate_patch(&ancient).is_err());

        let ok = UpdateCarRequest {
            year: Some(2004),
            ..Default::default()
        };
        assert!(validate_patch(&ok).is_ok());
    }
}
