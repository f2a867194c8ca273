//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub created_at: DateTime<Utc>,
}

/// Post with its attached image URLs, as listed on a profile
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostWithImages {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: String,
}

/// Deleted post and the URLs of the images it carried
#[derive(Debug, Clone)]
pub struct DeletedPost {
    pub post: Post,
    pub image_urls: Vec<String>,
}
