//! Input validation utilities

use chrono::{Datelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Longest caption accepted on a post
pub const MAX_CAPTION_LEN: usize = 2200;
/// Longest comment accepted
pub const MAX_COMMENT_LEN: usize = 1000;
/// Year of the first production automobile
const FIRST_CAR_YEAR: i32 = 1886;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password length; the identity provider enforces its own policy
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a post caption
pub fn validate_caption(caption: &str) -> Result<(), String> {
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(format!(
            "Caption must be at most {} characters long",
            MAX_CAPTION_LEN
        ));
    }

    Ok(())
}

/// Validate comment text
pub fn validate_comment(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Comment text is required".to_string());
    }

    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(format!(
            "Comment must be at most {} characters long",
            MAX_COMMENT_LEN
        ));
    }

    Ok(())
}

/// Validate the identifying fields of a car
pub fn validate_car(make: &str, model: &str, year: i32) -> Result<(), String> {
    if make.trim().is_empty() {
        return Err("Make is required".to_string());
    }

    if model.trim().is_empty() {
        return Err("Model is required".to_string());
    }

    validate_year(year)
}

/// Validate a model year
pub fn validate_year(year: i32) -> Result<(), String> {
    let latest = Utc::now().year() + 1;
    if !(FIRST_CAR_YEAR..=latest).contains(&year) {
        return Err(format!(
            "Year must be between {} and {}",
            FIRST_CAR_YEAR, latest
        ));
    }

    Ok(())
}
