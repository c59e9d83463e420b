//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::CurrentUser;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub code: String,
}

/// Public view of a user; never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
    pub created_at: String,
}

impl From<CurrentUser> for UserResponse {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use uuid::Uuid;

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1234".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.email, "alice@example.com");
        Ok(())
    }

    #[test]
    fn user_response_hides_nothing_it_should_show() -> Result<()> {
        let id = Uuid::new_v4();
        let user = CurrentUser {
            id,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: None,
            is_email_verified: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(UserResponse::from(user))?;
        assert_eq!(
            value.get("id").and_then(serde_json::Value::as_str),
            Some(id.to_string().as_str())
        );
        assert_eq!(
            value.get("is_email_verified").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert!(value.get("password").is_none());
        assert!(value.get("password_hash").is_none());
        Ok(())
    }
}
