//! Image models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Image attached to exactly one car or post
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub car_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddImageRequest {
    pub car_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    #[serde(default)]
    pub url: String,
}

/// The single parent an image hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageParent {
    Car(Uuid),
    Post(Uuid),
}

impl ImageParent {
    /// Resolve the parent from the request, requiring exactly one id
    pub fn from_ids(car_id: Option<Uuid>, post_id: Option<Uuid>) -> Result<Self, String> {
        match (car_id, post_id) {
            (Some(car), None) => Ok(Self::Car(car)),
            (None, Some(post)) => Ok(Self::Post(post)),
            (Some(_), Some(_)) => Err("Provide either car_id or post_id, not both".to_string()),
            (None, None) => Err("Provide car_id or post_id".to_string()),
        }
    }
}

/// Response of a successful binary upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub bucket: String,
    pub filename: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_requires_exactly_one_id() {
        let id = Uuid::new_v4();
        assert_eq!(ImageParent::from_ids(Some(id), None), Ok(ImageParent::Car(id)));
        assert_eq!(ImageParent::from_ids(None, Some(id)), Ok(ImageParent::Post(id)));
        assert!(ImageParent::from_ids(Some(id), Some(id)).is_err());
        assert!(ImageParent::from_ids(None, None).is_err());
    }
}
