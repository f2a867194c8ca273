//! Redline API service
//!
//! REST backend for the Redline garage and social feed: profiles, cars,
//! service histories, posts with images, comments, likes and follows.

use sqlx::migrate::Migrator;

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod ownership;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;

pub use state::AppState;

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
