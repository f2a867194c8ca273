//! Custom error types for the common library
//!
//! This module defines the database error type shared by every service
//! together with the classification of Postgres constraint violations.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Constraint violations the services react to explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// `23505`: a unique index or primary key already holds the value
    Unique,
    /// `23503`: a referenced row does not exist
    ForeignKey,
    /// `23514`: a CHECK constraint rejected the row
    Check,
}

impl ConstraintViolation {
    /// Map a Postgres SQLSTATE code to a violation kind
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(Self::Unique),
            "23503" => Some(Self::ForeignKey),
            "23514" => Some(Self::Check),
            _ => None,
        }
    }

    /// Classify a sqlx error, returning `None` for anything that is not a
    /// constraint violation reported by the database
    pub fn of(err: &SqlxError) -> Option<Self> {
        let db_err = err.as_database_error()?;
        let code = db_err.code()?;
        Self::from_code(&code)
    }
}
