//! User model and related functionality

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::nullable;

/// Days that must pass between two username changes
pub const USERNAME_CHANGE_COOLDOWN_DAYS: i64 = 30;

/// User profile entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub avatar_filename: Option<String>,
    pub last_username_change: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Minimal user projection used in lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Request for account signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(default)]
    pub bio: String,
}

/// Response for account signup
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: User,
}

/// Request for creating the profile of an already authenticated identity
#[derive(Debug, Deserialize)]
pub struct EnsureUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBioRequest {
    pub new_bio: String,
}

/// Profile patch; `url`/`filename` set to `null` clear the avatar
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub filename: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeUsernameRequest {
    pub new_username: String,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Earliest instant a username may change again, `None` if it never changed
pub fn next_username_change(last_change: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    last_change.map(|last| last + TimeDelta::days(USERNAME_CHANGE_COOLDOWN_DAYS))
}

/// Enforce the once-per-cooldown username rule
///
/// Returns the earliest allowed instant when a change at `now` is too soon.
pub fn check_username_change(
    last_change: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), DateTime<Utc>> {
    match next_username_change(last_change) {
        Some(next_allowed) if now < next_allowed => Err(next_allowed),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_change_is_always_allowed() {
        assert!(check_username_change(None, Utc::now()).is_ok());
    }

    #[test]
    fn change_within_cooldown_is_rejected() {
        let last = Utc::now();
        let now = last + TimeDelta::days(29) + TimeDelta::hours(23);

        let next = check_username_change(Some(last), now).unwrap_err();
        assert_eq!(next, last + TimeDelta::days(30));
    }

    #[test]
    fn change_after_cooldown_is_allowed() {
        let last = Utc::now() - TimeDelta::days(31);
        assert!(check_username_change(Some(last), Utc::now()).is_ok());

        let last = Utc::now();
        assert!(check_username_change(Some(last), last + TimeDelta::days(30)).is_ok());
    }

    #[test]
    fn profile_patch_tracks_explicit_nulls() {
        let patch: UpdateProfileRequest =
            serde_json::from_str(r#"{"bio":"track days","filename":null}"#).unwrap();

        assert_eq!(patch.bio.as_deref(), Some("track days"));
        assert_eq!(patch.url, None);
        assert_eq!(patch.filename, Some(None));
    }
}
