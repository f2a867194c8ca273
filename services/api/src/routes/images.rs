//! Image handlers, including raw uploads to object storage

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::{TypedHeader, extract::WithRejection, headers::ContentType};
use tracing::info;
use uuid::Uuid;

use super::{JsonBody, PathParam};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::image::{AddImageRequest, ImageParent, UploadResponse},
    storage::{Bucket, extension_for},
};

/// Attach an already uploaded image to a car or post
pub async fn add_image(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<AddImageRequest>,
) -> ApiResult<impl IntoResponse> {
    let parent =
        ImageParent::from_ids(payload.car_id, payload.post_id).map_err(ApiError::BadRequest)?;

    let url = payload.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("Image url is required".to_string()));
    }

    let image = state.image_repository.create(user.id, parent, url).await?;

    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn get_post_images(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let images = state
        .image_repository
        .list_by_post(post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get images", e))?;

    Ok(Json(images))
}

pub async fn delete_image(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(image_id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let image = state.image_repository.delete(image_id, user.id).await?;

    state
        .storage
        .remove_urls(user.id, std::slice::from_ref(&image.url))
        .await;

    Ok(Json(image))
}

/// Store a raw image body in one of the upload buckets
pub async fn upload_image(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(bucket), _): PathParam<String>,
    content_type: Option<TypedHeader<ContentType>>,
    WithRejection(body, _): WithRejection<Bytes, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let bucket: Bucket = bucket.parse()?;

    let content_type = content_type
        .map(|TypedHeader(content_type)| content_type.to_string())
        .filter(|ct| extension_for(ct).is_some())
        .ok_or_else(|| {
            ApiError::BadRequest("Content-Type must be a supported image type".to_string())
        })?;

    let stored = state
        .storage
        .upload(bucket, user.id, &content_type, body.to_vec())
        .await?;

    info!("User {} uploaded {}/{}", user.id, stored.bucket, stored.key);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            bucket: stored.bucket.to_string(),
            filename: stored.key,
            url: stored.url,
        }),
    ))
}
