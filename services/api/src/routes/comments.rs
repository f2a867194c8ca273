//! Comment handlers

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
    models::comment::CreateCommentRequest,
    validation::validate_comment,
};

pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
    WithRejection(Json(payload), _): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = payload.text.trim();
    validate_comment(text).map_err(ApiError::BadRequest)?;

    let comment = state.comment_repository.create(post_id, user.id, text).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comments on a post, newest first
pub async fn get_comments(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let comments = state
        .comment_repository
        .list_by_post(post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get comments", e))?;

    Ok(Json(comments))
}

pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let removed = state.comment_repository.delete(comment_id, user.id).await?;
    Ok(Json(removed))
}
