//! Shared SQL storage helpers for lists, memberships, items, and messages.
//!
//! Errors are surfaced as `ApiError` so guard checks and handlers can bubble
//! them with `?`. Membership rows carry the requester's role; response DTOs
//! never include rows the requester is not allowed to see.

use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{
    ItemResponse, ItemStatus, ListResponse, MemberResponse, MentionItemResponse,
    MentionMemberResponse, MentionsResponse, MessageResponse,
};
use crate::api::handlers::auth::principal::{Membership, Role};
use crate::api::handlers::error::ApiError;

const TS_FORMAT: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS"Z"'"#;

fn role_from_row(row: &sqlx::postgres::PgRow) -> Result<Role, ApiError> {
    let raw: String = row.get("role");
    Role::from_db(&raw)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role in list_members: {raw}")))
}

fn item_from_row(row: &sqlx::postgres::PgRow) -> Result<ItemResponse, ApiError> {
    let raw: String = row.get("status");
    let status = ItemStatus::from_db(&raw)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown item status: {raw}")))?;
    Ok(ItemResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        quantity: row.get("quantity"),
        status,
        notes: row.get("notes"),
        created_by: row.get::<Uuid, _>("created_by").to_string(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn list_from_row(row: &sqlx::postgres::PgRow) -> Result<ListResponse, ApiError> {
    Ok(ListResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        creator_id: row.get::<Uuid, _>("creator_id").to_string(),
        role: role_from_row(row)?,
        member_count: row.get("member_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) async fn list_exists(pool: &PgPool, list_id: Uuid) -> Result<bool, ApiError> {
    let query = "SELECT EXISTS(SELECT 1 FROM lists WHERE id = $1) AS exists";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(list_id)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(row.get("exists"))
}

pub(crate) async fn find_membership(
    pool: &PgPool,
    list_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Membership>, ApiError> {
    let query = "SELECT id, role FROM list_members WHERE list_id = $1 AND user_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    match row {
        Some(row) => Ok(Some(Membership {
            member_id: row.get("id"),
            role: role_from_row(&row)?,
        })),
        None => Ok(None),
    }
}

/// Create a list and its CREATOR membership atomically.
pub(super) async fn create_list(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
) -> Result<ListResponse, ApiError> {
    let mut tx = pool.begin().await?;

    let insert_list = format!(
        r"
        INSERT INTO lists (name, creator_id)
        VALUES ($1, $2)
        RETURNING id, name, creator_id,
            to_char(created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', {TS_FORMAT}) AS updated_at
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = insert_list.as_str()
    );
    let row = sqlx::query(&insert_list)
        .bind(name)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await?;

    let list_id: Uuid = row.get("id");

    let insert_member = r"
        INSERT INTO list_members (list_id, user_id, role)
        VALUES ($1, $2, 'CREATOR')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = insert_member
    );
    sqlx::query(insert_member)
        .bind(list_id)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await?;

    tx.commit().await?;

    Ok(ListResponse {
        id: list_id.to_string(),
        name: row.get("name"),
        creator_id: row.get::<Uuid, _>("creator_id").to_string(),
        role: Role::Creator,
        member_count: 1,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Lists the user belongs to, newest first, with their role on each.
pub(super) async fn lists_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ListResponse>, ApiError> {
    let query = format!(
        r"
        SELECT l.id, l.name, l.creator_id, m.role,
            (SELECT COUNT(*) FROM list_members c WHERE c.list_id = l.id) AS member_count,
            to_char(l.created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at,
            to_char(l.updated_at AT TIME ZONE 'utc', {TS_FORMAT}) AS updated_at
        FROM lists l
        JOIN list_members m ON m.list_id = l.id
        WHERE m.user_id = $1
        ORDER BY l.created_at DESC
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    rows.iter().map(list_from_row).collect()
}

pub(super) async fn get_list(
    pool: &PgPool,
    list_id: Uuid,
    role: Role,
) -> Result<Option<ListResponse>, ApiError> {
    let query = format!(
        r"
        SELECT l.id, l.name, l.creator_id,
            (SELECT COUNT(*) FROM list_members c WHERE c.list_id = l.id) AS member_count,
            to_char(l.created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at,
            to_char(l.updated_at AT TIME ZONE 'utc', {TS_FORMAT}) AS updated_at
        FROM lists l
        WHERE l.id = $1
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(list_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.map(|row| ListResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        creator_id: row.get::<Uuid, _>("creator_id").to_string(),
        role,
        member_count: row.get("member_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

pub(super) async fn rename_list(
    pool: &PgPool,
    list_id: Uuid,
    name: &str,
    role: Role,
) -> Result<Option<ListResponse>, ApiError> {
    let query = format!(
        r"
        UPDATE lists
        SET name = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, creator_id,
            (SELECT COUNT(*) FROM list_members c WHERE c.list_id = lists.id) AS member_count,
            to_char(created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', {TS_FORMAT}) AS updated_at
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(list_id)
        .bind(name)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.map(|row| ListResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        creator_id: row.get::<Uuid, _>("creator_id").to_string(),
        role,
        member_count: row.get("member_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

/// Delete the list; items, messages, members, and invites cascade.
pub(super) async fn delete_list(pool: &PgPool, list_id: Uuid) -> Result<bool, ApiError> {
    let query = "DELETE FROM lists WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(list_id)
        .execute(pool)
        .instrument(span)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn members_of(
    pool: &PgPool,
    list_id: Uuid,
) -> Result<Vec<MemberResponse>, ApiError> {
    let query = format!(
        r"
        SELECT m.id, m.user_id, u.username, u.avatar_url, m.role,
            to_char(m.created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at
        FROM list_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.list_id = $1
        ORDER BY m.created_at ASC
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(list_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(MemberResponse {
                id: row.get::<Uuid, _>("id").to_string(),
                user_id: row.get::<Uuid, _>("user_id").to_string(),
                username: row.get("username"),
                avatar_url: row.get("avatar_url"),
                role: role_from_row(row)?,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

/// Role of a member row, scoped to the list to prevent cross-list confusion.
pub(super) async fn member_role(
    pool: &PgPool,
    list_id: Uuid,
    member_id: Uuid,
) -> Result<Option<Role>, ApiError> {
    let query = "SELECT role FROM list_members WHERE id = $1 AND list_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(member_id)
        .bind(list_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    match row {
        Some(row) => Ok(Some(role_from_row(&row)?)),
        None => Ok(None),
    }
}

pub(super) async fn remove_member(
    pool: &PgPool,
    list_id: Uuid,
    member_id: Uuid,
) -> Result<bool, ApiError> {
    let query = "DELETE FROM list_members WHERE id = $1 AND list_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(member_id)
        .bind(list_id)
        .execute(pool)
        .instrument(span)
        .await?;

    Ok(result.rows_affected() > 0)
}

const ITEM_COLUMNS: &str = r#"id, name, quantity, status, notes, created_by,
        to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
        to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#;

pub(super) async fn items_of(pool: &PgPool, list_id: Uuid) -> Result<Vec<ItemResponse>, ApiError> {
    let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE list_id = $1 ORDER BY created_at ASC");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(list_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    rows.iter().map(item_from_row).collect()
}

pub(super) async fn insert_item(
    pool: &PgPool,
    list_id: Uuid,
    created_by: Uuid,
    name: &str,
    quantity: i32,
    notes: Option<&str>,
) -> Result<ItemResponse, ApiError> {
    let query = format!(
        r"
        INSERT INTO items (list_id, created_by, name, quantity, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ITEM_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(list_id)
        .bind(created_by)
        .bind(name)
        .bind(quantity)
        .bind(notes)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    item_from_row(&row)
}

/// `notes` carries presence separately from nullability: `None` leaves the
/// column alone, `Some(None)` clears it.
pub(super) struct ItemPatch<'a> {
    pub(super) name: Option<&'a str>,
    pub(super) quantity: Option<i32>,
    pub(super) status: Option<ItemStatus>,
    pub(super) notes: Option<Option<&'a str>>,
}

pub(super) async fn update_item(
    pool: &PgPool,
    list_id: Uuid,
    item_id: Uuid,
    patch: &ItemPatch<'_>,
) -> Result<Option<ItemResponse>, ApiError> {
    let query = format!(
        r"
        UPDATE items
        SET name = COALESCE($3, name),
            quantity = COALESCE($4, quantity),
            status = COALESCE($5, status),
            notes = CASE WHEN $6 THEN $7 ELSE notes END,
            updated_at = NOW()
        WHERE id = $1 AND list_id = $2
        RETURNING {ITEM_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(item_id)
        .bind(list_id)
        .bind(patch.name)
        .bind(patch.quantity)
        .bind(patch.status.map(ItemStatus::as_str))
        .bind(patch.notes.is_some())
        .bind(patch.notes.flatten())
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    match row {
        Some(row) => Ok(Some(item_from_row(&row)?)),
        None => Ok(None),
    }
}

pub(super) async fn delete_item(
    pool: &PgPool,
    list_id: Uuid,
    item_id: Uuid,
) -> Result<bool, ApiError> {
    let query = "DELETE FROM items WHERE id = $1 AND list_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(item_id)
        .bind(list_id)
        .execute(pool)
        .instrument(span)
        .await?;

    Ok(result.rows_affected() > 0)
}

const MENTION_LIMIT: i64 = 5;

/// Escape LIKE metacharacters so the search term matches literally.
pub(super) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_");
    format!("%{escaped}%")
}

/// Autocomplete suggestions for @-mentions: members by username, items by
/// name, each capped at five rows.
pub(super) async fn mentions_of(
    pool: &PgPool,
    list_id: Uuid,
    term: &str,
) -> Result<MentionsResponse, ApiError> {
    let pattern = like_pattern(term);

    let members_query = r"
        SELECT u.id, u.username, u.avatar_url
        FROM list_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.list_id = $1 AND u.username ILIKE $2
        ORDER BY u.username ASC
        LIMIT $3
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = members_query
    );
    let member_rows = sqlx::query(members_query)
        .bind(list_id)
        .bind(&pattern)
        .bind(MENTION_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    let items_query = r"
        SELECT id, name, status
        FROM items
        WHERE list_id = $1 AND name ILIKE $2
        ORDER BY updated_at DESC
        LIMIT $3
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = items_query
    );
    let item_rows = sqlx::query(items_query)
        .bind(list_id)
        .bind(&pattern)
        .bind(MENTION_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    let members = member_rows
        .iter()
        .map(|row| MentionMemberResponse {
            id: row.get::<Uuid, _>("id").to_string(),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
        })
        .collect();

    let items = item_rows
        .iter()
        .map(|row| {
            let raw: String = row.get("status");
            let status = ItemStatus::from_db(&raw)
                .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown item status: {raw}")))?;
            Ok(MentionItemResponse {
                id: row.get::<Uuid, _>("id").to_string(),
                name: row.get("name"),
                status,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(MentionsResponse { members, items })
}

pub(super) async fn messages_of(
    pool: &PgPool,
    list_id: Uuid,
) -> Result<Vec<MessageResponse>, ApiError> {
    let query = format!(
        r"
        SELECT msg.id, msg.author_id, u.username, msg.content,
            to_char(msg.created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at
        FROM messages msg
        JOIN users u ON u.id = msg.author_id
        WHERE msg.list_id = $1
        ORDER BY msg.created_at ASC
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(list_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows
        .iter()
        .map(|row| MessageResponse {
            id: row.get::<Uuid, _>("id").to_string(),
            author_id: row.get::<Uuid, _>("author_id").to_string(),
            username: row.get("username"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub(super) async fn insert_message(
    pool: &PgPool,
    list_id: Uuid,
    author_id: Uuid,
    username: &str,
    content: &str,
) -> Result<MessageResponse, ApiError> {
    let query = format!(
        r"
        INSERT INTO messages (list_id, author_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, author_id, content,
            to_char(created_at AT TIME ZONE 'utc', {TS_FORMAT}) AS created_at
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(list_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(MessageResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        author_id: row.get::<Uuid, _>("author_id").to_string(),
        username: username.to_string(),
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}
