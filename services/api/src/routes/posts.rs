//! Post and feed handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{JsonBody, PathParam, QueryParams};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    feed::FeedQuery,
    middleware::AuthUser,
    models::post::CreatePostRequest,
    validation::validate_caption,
};

pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_caption(&payload.caption).map_err(ApiError::BadRequest)?;

    let post = state
        .post_repository
        .create(user.id, &payload.caption)
        .await
        .map_err(|e| ApiError::internal("Failed to create post", e))?;

    info!("User {} created post {}", user.id, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// One page of the feed for the caller
pub async fn get_feed(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = query
        .into_request(&state.settings.feed)
        .map_err(ApiError::BadRequest)?;

    let page = state
        .feed
        .page(user.id, &request, Utc::now())
        .await
        .map_err(|e| ApiError::internal("Failed to load feed", e))?;

    Ok(Json(page))
}

pub async fn get_user_posts(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let posts = state
        .post_repository
        .list_by_user(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get posts", e))?;

    Ok(Json(posts))
}

pub async fn get_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let item = state
        .feed
        .post(user.id, post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get post", e))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(item))
}

/// Delete one of the caller's posts along with its stored images
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.post_repository.delete(post_id, user.id).await?;

    state
        .storage
        .remove_urls(user.id, &deleted.image_urls)
        .await;
    info!("User {} deleted post {}", user.id, post_id);

    Ok(Json(deleted.post))
}
