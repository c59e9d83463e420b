//! List chat endpoints. Any member may read or post.

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
use super::types::{MESSAGE_MAX, MessageResponse, PostMessageRequest};
use crate::api::handlers::auth::AuthState;
use crate::api::handlers::auth::principal::{require_auth, require_list_role};
use crate::api::handlers::error::ApiError;

fn validate_message(content: &str) -> Result<&str, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.len() > MESSAGE_MAX {
        return Err(ApiError::Validation("Message must be 1-1000 characters"));
    }
    Ok(trimmed)
}

#[utoipa::path(
    get,
    path = "/v1/lists/{id}/messages",
    params(("id" = Uuid, Path, description = "List id")),
    responses(
        (status = 200, description = "Messages in chronological order", body = [MessageResponse]),
        (status = 403, description = "Not a member of this list"),
        (status = 404, description = "List not found"),
    ),
    tag = "lists"
)]
pub async fn get_messages(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, None).await?;
        storage::messages_of(&pool, id).await
    }
    .await;

    match result {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/lists/{id}/messages",
    params(("id" = Uuid, Path, description = "List id")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = MessageResponse),
        (status = 400, description = "Invalid message payload"),
        (status = 403, description = "Not a member of this list"),
        (status = 404, description = "List not found"),
    ),
    tag = "lists"
)]
#[instrument(skip(headers, pool, auth_state, payload))]
pub async fn post_message(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<PostMessageRequest>>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, None).await?;
        let Some(Json(request)) = payload else {
            return Err(ApiError::Validation("Missing payload"));
        };
        let content = validate_message(&request.content)?;
        storage::insert_message(&pool, id, user.id, &user.username, content).await
    }
    .await;

    match result {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(err) => err.into_response(),
    }
}
