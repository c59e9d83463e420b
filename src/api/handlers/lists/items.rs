//! List item endpoints. Reads are open to any member; writes require the
//! CREATOR or EDITOR role.

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

use super::storage::{self, ItemPatch};
use super::types::{CreateItemRequest, ITEM_NAME_MAX, ItemResponse, UpdateItemRequest};
use crate::api::handlers::auth::AuthState;
use crate::api::handlers::auth::principal::{Role, require_auth, require_list_role};
use crate::api::handlers::error::ApiError;

const WRITE_ROLES: &[Role] = &[Role::Creator, Role::Editor];

fn validate_item_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > ITEM_NAME_MAX {
        return Err(ApiError::Validation("Item name must be 1-200 characters"));
    }
    Ok(trimmed)
}

fn validate_quantity(quantity: i32) -> Result<i32, ApiError> {
    if quantity < 1 {
        return Err(ApiError::Validation("Quantity must be at least 1"));
    }
    Ok(quantity)
}

#[utoipa::path(
    get,
    path = "/v1/lists/{id}/items",
    params(("id" = Uuid, Path, description = "List id")),
    responses(
        (status = 200, description = "Items on the list", body = [ItemResponse]),
        (status = 403, description = "Not a member of this list"),
        (status = 404, description = "List not found"),
    ),
    tag = "lists"
)]
pub async fn get_items(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, None).await?;
        storage::items_of(&pool, id).await
    }
    .await;

    match result {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/lists/{id}/items",
    params(("id" = Uuid, Path, description = "List id")),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item added", body = ItemResponse),
        (status = 400, description = "Invalid item payload"),
        (status = 403, description = "Viewers cannot modify items"),
        (status = 404, description = "List not found"),
    ),
    tag = "lists"
)]
#[instrument(skip(headers, pool, auth_state, payload))]
pub async fn create_item(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CreateItemRequest>>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, Some(WRITE_ROLES)).await?;
        let Some(Json(request)) = payload else {
            return Err(ApiError::Validation("Missing payload"));
        };
        let name = validate_item_name(&request.name)?;
        let quantity = validate_quantity(request.quantity.unwrap_or(1))?;
        storage::insert_item(&pool, id, user.id, name, quantity, request.notes.as_deref()).await
    }
    .await;

    match result {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/lists/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "List id"),
        ("item_id" = Uuid, Path, description = "Item id"),
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid item payload"),
        (status = 403, description = "Viewers cannot modify items"),
        (status = 404, description = "List or item not found"),
    ),
    tag = "lists"
)]
#[instrument(skip(headers, pool, auth_state, payload))]
pub async fn patch_item(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<UpdateItemRequest>>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, Some(WRITE_ROLES)).await?;
        let Some(Json(request)) = payload else {
            return Err(ApiError::Validation("Missing payload"));
        };

        if request.name.is_none()
            && request.quantity.is_none()
            && request.status.is_none()
            && request.notes.is_none()
        {
            return Err(ApiError::Validation("No updates provided"));
        }

        let name = match request.name.as_deref() {
            Some(name) => Some(validate_item_name(name)?),
            None => None,
        };
        let quantity = match request.quantity {
            Some(quantity) => Some(validate_quantity(quantity)?),
            None => None,
        };

        let patch = ItemPatch {
            name,
            quantity,
            status: request.status,
            notes: request.notes.as_ref().map(Option::as_deref),
        };
        storage::update_item(&pool, id, item_id, &patch)
            .await?
            .ok_or(ApiError::ResourceNotFound("Item not found"))
    }
    .await;

    match result {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/lists/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "List id"),
        ("item_id" = Uuid, Path, description = "Item id"),
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 403, description = "Viewers cannot modify items"),
        (status = 404, description = "List or item not found"),
    ),
    tag = "lists"
)]
#[instrument(skip(headers, pool, auth_state))]
pub async fn delete_item(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let result = async {
        let user = require_auth(&headers, &pool, auth_state.config()).await?;
        require_list_role(&pool, id, user.id, Some(WRITE_ROLES)).await?;
        if storage::delete_item(&pool, id, item_id).await? {
            Ok(())
        } else {
            Err(ApiError::ResourceNotFound("Item not found"))
        }
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_names_are_trimmed_and_bounded() {
        assert_eq!(validate_item_name(" Milk ").ok(), Some("Milk"));
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"x".repeat(ITEM_NAME_MAX)).is_ok());
        assert!(validate_item_name(&"x".repeat(ITEM_NAME_MAX + 1)).is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(99).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }
}
