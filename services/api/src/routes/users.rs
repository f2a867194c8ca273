//! Profile and account handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{JsonBody, PathParam, QueryParams};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::user::{
        ChangeUsernameRequest, EnsureUserRequest, SignupRequest, SignupResponse, UpdateBioRequest,
        UpdateProfileRequest, UserSearchQuery,
    },
    validation::{validate_email, validate_password, validate_username},
};

const MAX_SEARCH_RESULTS: i64 = 20;

fn username_taken() -> ApiError {
    ApiError::BadRequest("Username already taken".to_string())
}

/// The provider account exists but its profile lost the username race
fn orphaned_identity(id: Uuid, username: &str) -> ApiError {
    warn!(
        "Identity {} has no profile: username {} was taken during signup",
        id, username
    );
    username_taken()
}

/// Create an account at the identity provider and its profile
pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    validate_email(email).map_err(ApiError::BadRequest)?;
    validate_password(&payload.password).map_err(ApiError::BadRequest)?;
    validate_username(username).map_err(ApiError::BadRequest)?;

    let existing = state
        .user_repository
        .find_by_username(username)
        .await
        .map_err(|e| ApiError::internal("Failed to look up username", e))?;
    if existing.is_some() {
        return Err(username_taken());
    }

    let id = state
        .identity
        .create_user(email, &payload.password, username)
        .await?;

    let created = state
        .user_repository
        .create(id, username, email, &payload.bio)
        .await
        .map_err(|e| {
            warn!("Identity {} has no profile after a failed insert", id);
            ApiError::internal("Failed to create profile", e)
        })?;

    let user = created.ok_or_else(|| orphaned_identity(id, username))?;

    info!("Signed up user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Signup successful".to_string(),
            user,
        }),
    ))
}

/// Return the caller's profile, creating it on first sign-in
pub async fn ensure_user(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<EnsureUserRequest>,
) -> ApiResult<Response> {
    if let Some(existing) = state
        .user_repository
        .find_by_id(user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
    {
        return Ok(Json(existing).into_response());
    }

    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?;
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    validate_username(username).map_err(ApiError::BadRequest)?;
    validate_email(email).map_err(ApiError::BadRequest)?;

    let created = state
        .user_repository
        .create(user.id, username, email, &payload.bio)
        .await
        .map_err(|e| ApiError::internal("Failed to create profile", e))?;

    if let Some(created) = created {
        info!("Created profile {} for {}", created.username, created.id);
        return Ok((StatusCode::CREATED, Json(created)).into_response());
    }

    // Lost a race against a concurrent ensure, or the username is in use
    let existing = state
        .user_repository
        .find_by_id(user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
        .ok_or_else(username_taken)?;

    Ok(Json(existing).into_response())
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Get a user by username
pub async fn get_user_by_username(
    State(state): State<AppState>,
    WithRejection(Path(username), _): PathParam<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_username(&username)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn search_users(
    _user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<UserSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let term = query.q.trim();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let users = state
        .user_repository
        .search(term, MAX_SEARCH_RESULTS)
        .await
        .map_err(|e| ApiError::internal("Failed to search users", e))?;

    Ok(Json(users))
}

pub async fn update_bio(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<UpdateBioRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = state
        .user_repository
        .update_bio(user.id, &payload.new_bio)
        .await
        .map_err(|e| ApiError::internal("Failed to update bio", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(updated))
}

/// Update bio and avatar; a replaced avatar is removed from storage
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let update = state
        .user_repository
        .update_profile(user.id, &payload)
        .await
        .map_err(|e| ApiError::internal("Failed to update profile", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state
        .storage
        .remove_urls(user.id, update.replaced_url.as_slice())
        .await;

    Ok(Json(update.user))
}

pub async fn change_username(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<ChangeUsernameRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_username = payload.new_username.trim();
    validate_username(new_username).map_err(ApiError::BadRequest)?;

    let updated = state
        .user_repository
        .change_username(user.id, new_username, Utc::now())
        .await?;

    info!("User {} is now {}", updated.id, updated.username);
    Ok(Json(updated))
}

/// Delete the caller's profile and everything it owns
pub async fn delete_account(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .user_repository
        .delete(user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete account", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state
        .storage
        .remove_urls(user.id, &deleted.object_urls)
        .await;
    info!("Deleted account {}", deleted.user.id);

    Ok(StatusCode::NO_CONTENT)
}
