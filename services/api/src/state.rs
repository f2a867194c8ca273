//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::TokenVerifier,
    config::Settings,
    feed::FeedService,
    identity::IdentityClient,
    repositories::{
        UserRepository, cars::CarRepository, comments::CommentRepository, feed::PgFeedStore,
        follows::FollowRepository, images::ImageRepository, likes::LikeRepository,
        mods::ModRepository, posts::PostRepository, updates::ServiceUpdateRepository,
    },
    storage::ObjectStorage,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub token_verifier: TokenVerifier,
    pub identity: IdentityClient,
    pub storage: ObjectStorage,
    pub feed: FeedService<PgFeedStore>,
    pub user_repository: UserRepository,
    pub car_repository: CarRepository,
    pub post_repository: PostRepository,
    pub comment_repository: CommentRepository,
    pub like_repository: LikeRepository,
    pub follow_repository: FollowRepository,
    pub image_repository: ImageRepository,
    pub mod_repository: ModRepository,
    pub update_repository: ServiceUpdateRepository,
}

impl AppState {
    /// Wire repositories and services around a pool and external clients
    pub fn new(
        db_pool: PgPool,
        settings: Settings,
        identity: IdentityClient,
        storage: ObjectStorage,
    ) -> Self {
        Self {
            token_verifier: TokenVerifier::new(&settings.auth),
            feed: FeedService::new(PgFeedStore::new(db_pool.clone()), &settings.feed),
            user_repository: UserRepository::new(db_pool.clone()),
            car_repository: CarRepository::new(db_pool.clone()),
            post_repository: PostRepository::new(db_pool.clone()),
            comment_repository: CommentRepository::new(db_pool.clone()),
            like_repository: LikeRepository::new(db_pool.clone()),
            follow_repository: FollowRepository::new(db_pool.clone()),
            image_repository: ImageRepository::new(db_pool.clone()),
            mod_repository: ModRepository::new(db_pool.clone()),
            update_repository: ServiceUpdateRepository::new(db_pool.clone()),
            settings: Arc::new(settings),
            identity,
            storage,
            db_pool,
        }
    }
}
