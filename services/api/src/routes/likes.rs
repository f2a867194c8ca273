//! Like handlers

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

use super::PathParam;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};

pub async fn like_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.like_repository.like(post_id, user.id).await?;

    Ok(Json(json!({ "liked": true })))
}

pub async fn unlike_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let unliked = state
        .like_repository
        .unlike(post_id, user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to unlike post", e))?;

    Ok(Json(json!({ "unliked": unliked })))
}

pub async fn like_count(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let count = state
        .like_repository
        .count(post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to count likes", e))?;

    Ok(Json(json!({ "count": count })))
}

pub async fn like_status(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let has_liked = state
        .like_repository
        .has_liked(post_id, user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get like status", e))?;

    Ok(Json(json!({ "has_liked": has_liked })))
}
