//! Car (garage) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::nullable;

/// Car entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Car joined with its owner's username
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CarWithOwner {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub car: Car,
    pub owner_username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Partial car update; `url`/`filename` set to `null` clear the photo
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCarRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub filename: Option<Option<String>>,
}

impl UpdateCarRequest {
    pub fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.url.is_none()
            && self.filename.is_none()
    }
}

/// Raw search parameters; `year` stays textual so a bad value is a 400
#[derive(Debug, Default, Deserialize)]
pub struct CarSearchQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

/// Validated search filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarSearch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl CarSearchQuery {
    pub fn into_search(self) -> Result<CarSearch, String> {
        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| "Year must be a number".to_string())?,
            ),
        };

        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let search = CarSearch {
            make: non_blank(self.make),
            model: non_blank(self.model),
            year,
        };

        if search.make.is_none() && search.model.is_none() && search.year.is_none() {
            return Err("Provide at least one filter to search".to_string());
        }

        Ok(search)
    }
}

/// Identifier and stored photo of a deleted car
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeletedCar {
    pub id: Uuid,
    pub filename: Option<String>,
    #[serde(skip)]
    pub url: Option<String>,
    /// Images that were attached to the car
    #[serde(skip)]
    #[sqlx(skip)]
    pub image_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_requires_a_filter() {
        let err = CarSearchQuery::default().into_search().unwrap_err();
        assert_eq!(err, "Provide at least one filter to search");

        let blank = CarSearchQuery {
            make: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.into_search().is_err());
    }

    #[test]
    fn search_rejects_non_numeric_year() {
        let query = CarSearchQuery {
            year: Some("nineteen-ninety".into()),
            ..Default::default()
        };
        assert_eq!(query.into_search().unwrap_err(), "Year must be a number");
    }

    #[test]
    fn search_keeps_given_filters() {
        let query = CarSearchQuery {
            make: Some("Honda".into()),
            model: None,
            year: Some("1999".into()),
        };
        assert_eq!(
            query.into_search().unwrap(),
            CarSearch {
                make: Some("Honda".into()),
                model: None,
                year: Some(1999),
            }
        );
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UpdateCarRequest::default().is_empty());
        let patch: UpdateCarRequest = serde_json::from_str(r#"{"url":null}"#).unwrap();
        assert!(!patch.is_empty());
    }
}
