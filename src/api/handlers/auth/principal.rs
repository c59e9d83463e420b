//! Authenticated principal extraction and list-level authorization.
//!
//! Flow Overview: verify the session token, then re-fetch the user row so a
//! deleted account invalidates outstanding tokens. List access is resolved
//! per request from the membership table.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{session::current_claims, state::AuthConfig, storage};
use crate::api::handlers::{error::ApiError, lists};

/// Authenticated user context derived from the session token.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
    pub created_at: String,
}

/// Membership role on a list. Stored as text in `list_members.role`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Creator,
    Editor,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creator => "CREATOR",
            Self::Editor => "EDITOR",
            Self::Viewer => "VIEWER",
        }
    }

    #[must_use]
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "CREATOR" => Some(Self::Creator),
            "EDITOR" => Some(Self::Editor),
            "VIEWER" => Some(Self::Viewer),
            _ => None,
        }
    }

    #[must_use]
    pub fn allows(self, allowed: &[Self]) -> bool {
        allowed.contains(&self)
    }
}

/// A resolved membership row for the requesting user.
#[derive(Clone, Copy, Debug)]
pub struct Membership {
    pub member_id: Uuid,
    pub role: Role,
}

/// Resolve the session token into a user, or fail with 401/404.
///
/// # Errors
/// `Unauthenticated` for a missing or invalid token, `UserNotFound` when the
/// user row was deleted after the token was minted.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<CurrentUser, ApiError> {
    let claims = current_claims(headers, config).ok_or(ApiError::Unauthenticated)?;
    storage::find_user_by_id(pool, claims.id)
        .await?
        .ok_or(ApiError::UserNotFound)
}

/// Check that a user may act on a list.
///
/// Checks short-circuit in order: list existence (404), membership (403),
/// then role (403) when `allowed` names specific roles.
///
/// # Errors
/// `ResourceNotFound`, `Forbidden`, or a database error.
pub async fn require_list_role(
    pool: &PgPool,
    list_id: Uuid,
    user_id: Uuid,
    allowed: Option<&[Role]>,
) -> Result<Membership, ApiError> {
    if !lists::storage::list_exists(pool, list_id).await? {
        return Err(ApiError::ResourceNotFound("List not found"));
    }

    let membership = lists::storage::find_membership(pool, list_id, user_id)
        .await?
        .ok_or(ApiError::Forbidden("You are not a member of this list"))?;

    if let Some(allowed) = allowed {
        if !membership.role.allows(allowed) {
            return Err(ApiError::Forbidden(
                "Your role does not permit this action",
            ));
        }
    }

    Ok(membership)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_db_text() {
        for role in [Role::Creator, Role::Editor, Role::Viewer] {
            assert_eq!(Role::from_db(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_db("OWNER"), None);
        assert_eq!(Role::from_db("creator"), None);
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Role::Creator).expect("json"),
            "\"CREATOR\""
        );
        let decoded: Role = serde_json::from_str("\"VIEWER\"").expect("json");
        assert_eq!(decoded, Role::Viewer);
    }

    #[test]
    fn allows_checks_membership_in_slice() {
        assert!(Role::Editor.allows(&[Role::Creator, Role::Editor]));
        assert!(!Role::Viewer.allows(&[Role::Creator, Role::Editor]));
        assert!(!Role::Creator.allows(&[]));
    }
}
