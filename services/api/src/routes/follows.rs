//! Follow graph handlers

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::PathParam;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};

pub async fn follow_user(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(followee_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if followee_id == user.id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }

    state.follow_repository.follow(user.id, followee_id).await?;

    info!("User {} follows {}", user.id, followee_id);
    Ok(Json(json!({ "followed": true })))
}

pub async fn unfollow_user(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(followee_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let unfollowed = state
        .follow_repository
        .unfollow(user.id, followee_id)
        .await
        .map_err(|e| ApiError::internal("Failed to unfollow user", e))?;

    Ok(Json(json!({ "unfollowed": unfollowed })))
}

pub async fn get_followers(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let followers = state
        .follow_repository
        .followers(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get followers", e))?;

    Ok(Json(followers))
}

pub async fn get_following(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let following = state
        .follow_repository
        .following(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get followed users", e))?;

    Ok(Json(following))
}
