//! API service routes

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{AppState, error::ApiError, middleware::auth_middleware};

pub mod cars;
pub mod comments;
pub mod follows;
pub mod images;
pub mod likes;
pub mod mods;
pub mod posts;
pub mod updates;
pub mod users;

/// JSON body whose rejection renders as an API error
pub(crate) type JsonBody<T> = WithRejection<Json<T>, ApiError>;
/// Query string whose rejection renders as an API error
pub(crate) type QueryParams<T> = WithRejection<Query<T>, ApiError>;
/// Path parameters whose rejection renders as an API error
pub(crate) type PathParam<T> = WithRejection<Path<T>, ApiError>;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/users/ensure", post(users::ensure_user))
        .route("/api/users/search", get(users::search_users))
        .route("/api/users/bio", patch(users::update_bio))
        .route("/api/users/profile", patch(users::update_profile))
        .route("/api/users/username", patch(users::change_username))
        .route("/api/users", delete(users::delete_account))
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/feed", get(posts::get_feed))
        .route("/api/posts/user/:user_id", get(posts::get_user_posts))
        .route(
            "/api/posts/:post_id",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route("/api/cars", post(cars::create_car))
        .route("/api/cars/detail/:car_id", get(cars::get_car))
        .route("/api/cars/search", get(cars::search_cars))
        .route("/api/cars/user/:user_id", get(cars::get_user_cars))
        .route(
            "/api/cars/:car_id",
            patch(cars::update_car).delete(cars::delete_car),
        )
        .route("/api/mods", post(mods::create_mods))
        // GET takes a car id, DELETE a mod id
        .route("/api/mods/:id", get(mods::get_car_mods).delete(mods::delete_mod))
        .route("/api/updates", post(updates::create_update))
        .route(
            "/api/updates/:id",
            get(updates::get_car_updates).delete(updates::delete_update),
        )
        .route(
            "/api/likes/:post_id",
            post(likes::like_post).delete(likes::unlike_post),
        )
        .route("/api/likes/count/:post_id", get(likes::like_count))
        .route("/api/likes/status/:post_id", get(likes::like_status))
        .route(
            "/api/follows/:followee_id",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route("/api/follows/followers/:user_id", get(follows::get_followers))
        .route("/api/follows/following/:user_id", get(follows::get_following))
        // GET and POST take a post id, DELETE a comment id
        .route(
            "/api/comments/:id",
            get(comments::get_comments)
                .post(comments::add_comment)
                .delete(comments::delete_comment),
        )
        .route("/api/images", post(images::add_image))
        .route("/api/images/post/:post_id", get(images::get_post_images))
        .route("/api/images/:image_id", delete(images::delete_image))
        .route(
            "/api/images/upload/:bucket",
            post(images::upload_image)
                .layer(DefaultBodyLimit::max(state.settings.storage.max_upload_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/id/:user_id", get(users::get_user))
        .route("/api/users/username/:username", get(users::get_user_by_username))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.settings.server.allowed_origin.as_deref()))
        .with_state(state)
}

/// CORS policy; any origin unless one is configured
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match allowed_origin {
        None => layer.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(origin) => layer.allow_origin(origin),
            Err(e) => {
                warn!("Ignoring invalid allowed origin {:?}: {}", origin, e);
                layer
            }
        },
    }
}

/// Liveness probe
pub async fn ping() -> &'static str {
    "pong"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match common::database::health_check(&state.db_pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "redline-api",
                "database": "connected"
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "redline-api",
                    "database": "unreachable"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::test_support::{self, token_for},
        config::{FeedSettings, IdentitySettings, ServerSettings, Settings, StorageSettings},
        identity::IdentityClient,
        storage::ObjectStorage,
    };
    use aws_config::{BehaviorVersion, Region};
    use aws_sdk_s3::config::Credentials;
    use axum::{
        body::Body,
        http::{Method, Request, header},
    };
    use common::database::DatabaseConfig;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_settings() -> Settings {
        Settings {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            auth: test_support::settings(),
            identity: IdentitySettings {
                url: "http://127.0.0.1:9".to_string(),
                service_key: "service-key".to_string(),
            },
            storage: StorageSettings {
                endpoint: Some("http://127.0.0.1:9".to_string()),
                region: "us-east-1".to_string(),
                public_base_url: "http://127.0.0.1:9/storage".to_string(),
                max_upload_bytes: 16,
            },
            feed: FeedSettings::default(),
        }
    }

    /// Router over a pool that never connects; requests reaching the
    /// database would fail, so every case here must be decided before that
    fn app() -> Router {
        let settings = test_settings();
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database.url)
            .expect("lazy pool should build");

        let s3 = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .force_path_style(true)
            .build();
        let storage = ObjectStorage::new(
            aws_sdk_s3::Client::from_conf(s3),
            settings.storage.public_base_url.clone(),
        );
        let identity = IdentityClient::new(reqwest::Client::new(), &settings.identity);

        create_router(AppState::new(pool, settings, identity, storage))
    }

    fn authed(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token_for(Uuid::new_v4())),
            )
    }

    async fn error_of(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let response = app()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"pong");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let response = app()
            .oneshot(Request::get("/api/posts/feed").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(response).await, "Missing or invalid token");
    }

    #[tokio::test]
    async fn forged_tokens_are_rejected() {
        let forged = test_support::sign(
            Uuid::new_v4(),
            "some-other-secret",
            test_support::AUDIENCE,
            test_support::now() + 3600,
        );

        let response = app()
            .oneshot(
                Request::delete("/api/users")
                    .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn feed_rejects_unknown_mode_and_half_cursor() {
        let response = app()
            .oneshot(
                authed(Method::GET, "/api/posts/feed?type=friends")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let uri = format!("/api/posts/feed?cursor_post_id={}", Uuid::new_v4());
        let response = app()
            .oneshot(authed(Method::GET, &uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(
                authed(Method::GET, "/api/posts/feed?limit=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let response = app()
            .oneshot(
                authed(Method::DELETE, "/api/cars/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn following_yourself_is_rejected() {
        let user = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::post(format!("/api/follows/{}", user))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(response).await, "You cannot follow yourself");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = app()
            .oneshot(
                authed(Method::POST, "/api/posts")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn uploads_are_checked_before_storage() {
        let response = app()
            .oneshot(
                authed(Method::POST, "/api/images/upload/avatars")
                    .header(header::CONTENT_TYPE, "image/png")
                    .body(Body::from(vec![1u8; 4]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(
                authed(Method::POST, "/api/images/upload/post-images")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(vec![1u8; 4]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(
                authed(Method::POST, "/api/images/upload/post-images")
                    .header(header::CONTENT_TYPE, "image/png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(
                authed(Method::POST, "/api/images/upload/post-images")
                    .header(header::CONTENT_TYPE, "image/png")
                    .body(Body::from(vec![1u8; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn invalid_origin_does_not_panic() {
        let _ = cors_layer(Some("bad\norigin"));
        let _ = cors_layer(Some("https://redline.example"));
        let _ = cors_layer(None);
    }
}
