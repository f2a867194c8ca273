//! Repositories for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::error::ConstraintViolation;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{User, UserSummary, UpdateProfileRequest, check_username_change};

pub mod cars;
pub mod comments;
pub mod feed;
pub mod follows;
pub mod images;
pub mod likes;
pub mod mods;
pub mod posts;
pub mod updates;

/// Turn free text into an `ILIKE` pattern matching it anywhere
pub(crate) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Outcome of a username change that did not go through
#[derive(Error, Debug)]
pub enum UsernameChangeError {
    #[error("user not found")]
    NotFound,

    #[error("username was changed recently, next change allowed at {next_allowed}")]
    TooSoon { next_allowed: DateTime<Utc> },

    #[error("username already taken")]
    Taken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row an insert referenced that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReference {
    Post,
    /// The acting user has no profile row yet
    Profile,
    /// The user being followed
    User,
}

impl MissingReference {
    /// Map a foreign-key constraint name to the row it points at
    ///
    /// Names are the Postgres defaults, `<table>_<column>_fkey`.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        let column = constraint.strip_suffix("_fkey")?;
        if column.ends_with("_post_id") {
            Some(MissingReference::Post)
        } else if column.ends_with("_followee_id") {
            Some(MissingReference::User)
        } else if column.ends_with("_user_id") || column.ends_with("_follower_id") {
            Some(MissingReference::Profile)
        } else {
            None
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MissingReference::Post => "Post",
            MissingReference::Profile => "Profile",
            MissingReference::User => "User",
        }
    }
}

/// Insert rejected because a referenced row is absent
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("{} not found", .0.title())]
    Missing(MissingReference),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ReferenceError {
    /// Classify an insert failure, keeping unrecognised errors as-is
    pub(crate) fn classify(err: sqlx::Error) -> Self {
        if ConstraintViolation::of(&err) != Some(ConstraintViolation::ForeignKey) {
            return ReferenceError::Database(err);
        }

        let missing = err
            .as_database_error()
            .and_then(|db| db.constraint())
            .and_then(MissingReference::from_constraint);

        match missing {
            Some(missing) => ReferenceError::Missing(missing),
            None => ReferenceError::Database(err),
        }
    }
}

/// Profile after an update, with the avatar URL it no longer references
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub user: User,
    pub replaced_url: Option<String>,
}

/// Deleted profile and the URLs of every stored object it referenced
#[derive(Debug, Clone)]
pub struct DeletedUser {
    pub user: User,
    pub object_urls: Vec<String>,
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a profile; `None` when the id or username is already in use
    pub async fn create(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        bio: &str,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, bio)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING id, username, email, bio, avatar_url, avatar_filename,
                      last_username_change, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(bio)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, bio, avatar_url, avatar_filename,
                   last_username_change, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by exact username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, bio, avatar_url, avatar_filename,
                   last_username_change, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Users whose username contains `term`, case-insensitively
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, avatar_url
            FROM users
            WHERE username ILIKE $1
            ORDER BY username
            LIMIT $2
            "#,
        )
        .bind(contains_pattern(term))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_bio(&self, id: Uuid, bio: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET bio = $2
            WHERE id = $1
            RETURNING id, username, email, bio, avatar_url, avatar_filename,
                      last_username_change, created_at
            "#,
        )
        .bind(id)
        .bind(bio)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Apply a partial profile update
    pub async fn update_profile(
        &self,
        id: Uuid,
        patch: &UpdateProfileRequest,
    ) -> Result<Option<ProfileUpdate>> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT avatar_url FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET bio = COALESCE($2, bio),
                avatar_url = CASE WHEN $3 THEN $4 ELSE avatar_url END,
                avatar_filename = CASE WHEN $5 THEN $6 ELSE avatar_filename END
            WHERE id = $1
            RETURNING id, username, email, bio, avatar_url, avatar_filename,
                      last_username_change, created_at
            "#,
        )
        .bind(id)
        .bind(patch.bio.as_deref())
        .bind(patch.url.is_some())
        .bind(patch.url.clone().flatten())
        .bind(patch.filename.is_some())
        .bind(patch.filename.clone().flatten())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced_url =
            previous.filter(|old| user.avatar_url.as_deref() != Some(old.as_str()));

        Ok(Some(ProfileUpdate { user, replaced_url }))
    }

    /// Change the username, at most once per cooldown period
    pub async fn change_username(
        &self,
        id: Uuid,
        new_username: &str,
        now: DateTime<Utc>,
    ) -> Result<User, UsernameChangeError> {
        let mut tx = self.pool.begin().await?;

        let last_change: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "SELECT last_username_change FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let last_change = last_change.ok_or(UsernameChangeError::NotFound)?;
        check_username_change(last_change, now)
            .map_err(|next_allowed| UsernameChangeError::TooSoon { next_allowed })?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, last_username_change = $3
            WHERE id = $1
            RETURNING id, username, email, bio, avatar_url, avatar_filename,
                      last_username_change, created_at
            "#,
        )
        .bind(id)
        .bind(new_username)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match ConstraintViolation::of(&e) {
            Some(ConstraintViolation::Unique) => UsernameChangeError::Taken,
            _ => UsernameChangeError::Database(e),
        })?;

        tx.commit().await?;
        Ok(user)
    }

    /// Delete a profile and everything it owns, returning the removed row
    pub async fn delete(&self, id: Uuid) -> Result<Option<DeletedUser>> {
        let mut tx = self.pool.begin().await?;

        let object_urls: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT avatar_url FROM users WHERE id = $1 AND avatar_url IS NOT NULL
            UNION ALL
            SELECT url FROM cars WHERE user_id = $1 AND url IS NOT NULL
            UNION ALL
            SELECT i.url
            FROM images i
            LEFT JOIN cars c ON c.id = i.car_id
            LEFT JOIN posts p ON p.id = i.post_id
            WHERE c.user_id = $1 OR p.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, username, email, bio, avatar_url, avatar_filename,
                      last_username_change, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user.map(|user| DeletedUser { user, object_urls }))
    }
}
