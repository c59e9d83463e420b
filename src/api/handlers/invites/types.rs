//! Request/response types for invite endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::handlers::auth::principal::Role;

pub const EXPIRY_HOURS_MIN: i64 = 1;
pub const EXPIRY_HOURS_MAX: i64 = 168;
pub const DEFAULT_EXPIRY_HOURS: i64 = 24;
pub const MAX_USES_MIN: i32 = 1;
pub const MAX_USES_MAX: i32 = 100;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct CreateInviteRequest {
    /// Hours until expiry, 1-168. Defaults to 24.
    pub expires_in_hours: Option<i64>,
    /// Redemption cap, 1-100. Absent means unlimited.
    pub max_uses: Option<i32>,
}

/// Explicit patch: absent fields stay untouched.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct UpdateInviteRequest {
    pub is_active: Option<bool>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct InviteResponse {
    pub id: String,
    pub token: String,
    pub expires_at: String,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: String,
}

/// Preview of an invite for a prospective member. Deliberately minimal:
/// never exposes list contents or member identities.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct InviteDetailsResponse {
    pub list_name: String,
    pub member_count: i64,
    pub expires_at: String,
    pub max_uses: Option<i32>,
    pub used_count: i32,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AcceptInviteResponse {
    pub list_id: String,
    pub list_name: String,
    pub role: Role,
}
