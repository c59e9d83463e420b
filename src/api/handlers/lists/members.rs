//! List membership endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::storage;
use super::types::MemberResponse;
use crate::api::handlers::auth::AuthState;
use crate::api::handlers::auth::principal::{Role, require_auth, require_list_role};
use crate::api::handlers::error::ApiError;

#[utoipa::path(
    get,
    path = "/v1/lists/{id}/members",
    params(("id" = Uuid, Path, description = "List id")),
    responses(
        (status = 200, description = "Members of the list", body = [MemberResponse]),
        (status = 403, description = "Not a member of this list"),
        (status = 404, description = "List not found"),
    ),
    tag = "lists"
)]
pub async fn get_members(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, None).await?;
        storage::members_of(&pool, id).await
    }
    .await;

    match result {
        Ok(members) => (StatusCode::OK, Json(members)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/lists/{id}/members/{member_id}",
    params(
        ("id" = Uuid, Path, description = "List id"),
        ("member_id" = Uuid, Path, description = "Membership row id"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "The creator membership cannot be removed"),
        (status = 403, description = "Only the creator can remove members"),
        (status = 404, description = "List or member not found"),
    ),
    tag = "lists"
)]
#[instrument(skip(headers, pool, auth_state))]
pub async fn remove_member(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, Some(&[Role::Creator])).await?;

        let role = storage::member_role(&pool, id, member_id)
            .await?
            .ok_or(ApiError::ResourceNotFound("Member not found"))?;

        // The creator row anchors list ownership; it only goes away with the list.
        if role == Role::Creator {
            return Err(ApiError::Validation(
                "The creator membership cannot be removed",
            ));
        }

        if storage::remove_member(&pool, id, member_id).await? {
            Ok(())
        } else {
            Err(ApiError::ResourceNotFound("Member not found"))
        }
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
