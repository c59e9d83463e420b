//! API handlers and shared utilities for Cartmate.
//!
//! This module organizes the service's route handlers and provides common
//! validation functions shared by the auth and profile endpoints.

pub mod auth;
pub mod error;
pub mod health;
pub mod invites;
pub mod lists;
pub mod me;
pub mod root;

use regex::Regex;

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Usernames are 3-20 characters: letters, digits, underscore.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_]{3,20}$").is_ok_and(|re| re.is_match(username))
}

/// Passwords need at least 8 characters with one letter and one digit.
pub fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}
