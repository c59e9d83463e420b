//! SQL storage for invites.
//!
//! Redemption runs the full eligibility chain inside a transaction with the
//! invite row locked, and increments `used_count` with a conditional update
//! that re-asserts capacity. Two racing accepts on a single-use invite yield
//! one success and one `Gone`.

use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::InviteResponse;
use crate::api::handlers::error::{ApiError, is_unique_violation};

const TS_FORMAT: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS"Z"'"#;

const INVITE_COLUMNS: &str = r#"id, token, max_uses, used_count, is_active,
        to_char(expires_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS expires_at,
        to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at"#;

fn invite_from_row(row: &sqlx::postgres::PgRow) -> InviteResponse {
    InviteResponse {
        id: row.get::<Uuid, _>("id").to_string(),
        token: row.get::<Uuid, _>("token").to_string(),
        expires_at: row.get("expires_at"),
        max_uses: row.get("max_uses"),
        used_count: row.get("used_count"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

/// Everything needed to decide whether a token can be previewed or redeemed,
/// fetched in one query so details and accept share the same chain.
#[derive(Debug)]
pub(super) struct InviteEligibility {
    pub(super) invite_id: Uuid,
    pub(super) list_id: Uuid,
    pub(super) list_name: String,
    pub(super) member_count: i64,
    pub(super) expires_at: String,
    pub(super) max_uses: Option<i32>,
    pub(super) used_count: i32,
    pub(super) is_active: bool,
    expired: bool,
    already_member: bool,
}

impl InviteEligibility {
    /// Checks run in order: active, not expired, under capacity, not already
    /// a member. Capacity exhaustion is terminal on its own; reactivating an
    /// exhausted invite does not revive it.
    pub(super) fn check(&self) -> Result<(), ApiError> {
        if !self.is_active {
            return Err(ApiError::Gone("Invite has been deactivated"));
        }
        if self.expired {
            return Err(ApiError::Gone("Invite has expired"));
        }
        if let Some(max_uses) = self.max_uses {
            if self.used_count >= max_uses {
                return Err(ApiError::Gone("Invite has reached its usage limit"));
            }
        }
        if self.already_member {
            return Err(ApiError::Conflict("You are already a member of this list"));
        }
        Ok(())
    }
}

fn eligibility_query(lock: bool) -> String {
    let suffix = if lock { " FOR UPDATE OF i" } else { "" };
    format!(
        r"
        SELECT i.id, i.list_id, i.max_uses, i.used_count, i.is_active,
            i.expires_at <= NOW() AS expired,
            to_char(i.expires_at AT TIME ZONE 'utc', {TS_FORMAT}) AS expires_at,
            l.name AS list_name,
            (SELECT COUNT(*) FROM list_members m WHERE m.list_id = i.list_id) AS member_count,
            EXISTS(
                SELECT 1 FROM list_members m
                WHERE m.list_id = i.list_id AND m.user_id = $2
            ) AS already_member
        FROM invites i
        JOIN lists l ON l.id = i.list_id
        WHERE i.token = $1{suffix}
        "
    )
}

fn eligibility_from_row(row: &sqlx::postgres::PgRow) -> InviteEligibility {
    InviteEligibility {
        invite_id: row.get("id"),
        list_id: row.get("list_id"),
        list_name: row.get("list_name"),
        member_count: row.get("member_count"),
        expires_at: row.get("expires_at"),
        max_uses: row.get("max_uses"),
        used_count: row.get("used_count"),
        is_active: row.get("is_active"),
        expired: row.get("expired"),
        already_member: row.get("already_member"),
    }
}

/// Read-only eligibility lookup for the details endpoint. Never mutates.
pub(super) async fn eligibility(
    pool: &PgPool,
    token: Uuid,
    user_id: Uuid,
) -> Result<Option<InviteEligibility>, ApiError> {
    let query = eligibility_query(false);
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.as_ref().map(eligibility_from_row))
}

pub(super) async fn create_invite(
    pool: &PgPool,
    list_id: Uuid,
    created_by: Uuid,
    expires_in_hours: i64,
    max_uses: Option<i32>,
) -> Result<InviteResponse, ApiError> {
    let query = format!(
        r"
        INSERT INTO invites (list_id, created_by, token, expires_at, max_uses)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 hour'), $5)
        RETURNING {INVITE_COLUMNS}
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
        .bind(Uuid::new_v4())
        .bind(expires_in_hours)
        .bind(max_uses)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(invite_from_row(&row))
}

/// Unexpired invites for a list, newest first.
pub(super) async fn invites_for_list(
    pool: &PgPool,
    list_id: Uuid,
) -> Result<Vec<InviteResponse>, ApiError> {
    let query = format!(
        r"
        SELECT {INVITE_COLUMNS}
        FROM invites
        WHERE list_id = $1 AND expires_at > NOW()
        ORDER BY created_at DESC
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

    Ok(rows.iter().map(invite_from_row).collect())
}

/// Resolves the list an invite belongs to. Distinguishes a missing invite
/// from a cross-list id mixup so handlers can return 404 vs 403.
pub(super) async fn assert_invite_in_list(
    pool: &PgPool,
    invite_id: Uuid,
    list_id: Uuid,
) -> Result<(), ApiError> {
    let query = "SELECT list_id FROM invites WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(invite_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    match row {
        None => Err(ApiError::ResourceNotFound("Invite not found")),
        Some(row) if row.get::<Uuid, _>("list_id") != list_id => {
            Err(ApiError::Forbidden("Invite does not belong to this list"))
        }
        Some(_) => Ok(()),
    }
}

pub(super) async fn set_invite_active(
    pool: &PgPool,
    invite_id: Uuid,
    list_id: Uuid,
    is_active: bool,
) -> Result<InviteResponse, ApiError> {
    let query = format!(
        r"
        UPDATE invites
        SET is_active = $3
        WHERE id = $1 AND list_id = $2
        RETURNING {INVITE_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(invite_id)
        .bind(list_id)
        .bind(is_active)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    row.as_ref()
        .map(invite_from_row)
        .ok_or(ApiError::ResourceNotFound("Invite not found"))
}

pub(super) async fn delete_invite(
    pool: &PgPool,
    invite_id: Uuid,
    list_id: Uuid,
) -> Result<bool, ApiError> {
    let query = "DELETE FROM invites WHERE id = $1 AND list_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(invite_id)
        .bind(list_id)
        .execute(pool)
        .instrument(span)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Redeem an invite: lock the row, re-run the eligibility chain, insert an
/// EDITOR membership, and bump `used_count` while re-asserting capacity.
/// All-or-nothing; a membership without the counter bump is never observable.
pub(super) async fn accept_invite(
    pool: &PgPool,
    token: Uuid,
    user_id: Uuid,
) -> Result<InviteEligibility, ApiError> {
    let mut tx = pool.begin().await?;

    let query = eligibility_query(true);
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Err(ApiError::ResourceNotFound("Invite not found"));
    };
    let eligibility = eligibility_from_row(&row);
    if let Err(err) = eligibility.check() {
        tx.rollback().await?;
        return Err(err);
    }

    let insert_member = r"
        INSERT INTO list_members (list_id, user_id, role)
        VALUES ($1, $2, 'EDITOR')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = insert_member
    );
    if let Err(err) = sqlx::query(insert_member)
        .bind(eligibility.list_id)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
    {
        tx.rollback().await?;
        // Another invite for the same list may have been redeemed meanwhile.
        if is_unique_violation(&err, "list_members_list_id_user_id_key") {
            return Err(ApiError::Conflict("You are already a member of this list"));
        }
        return Err(err.into());
    }

    let bump = r"
        UPDATE invites
        SET used_count = used_count + 1
        WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = bump
    );
    let result = sqlx::query(bump)
        .bind(eligibility.invite_id)
        .execute(&mut *tx)
        .instrument(span)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(ApiError::Gone("Invite has reached its usage limit"));
    }

    tx.commit().await?;
    Ok(eligibility)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn eligible() -> InviteEligibility {
        InviteEligibility {
            invite_id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            list_name: "Groceries".to_string(),
            member_count: 2,
            expires_at: "2026-01-01T00:00:00Z".to_string(),
            max_uses: Some(5),
            used_count: 0,
            is_active: true,
            expired: false,
            already_member: false,
        }
    }

    #[test]
    fn chain_accepts_a_fresh_invite() {
        assert!(eligible().check().is_ok());
    }

    #[test]
    fn chain_orders_deactivated_before_expired() {
        let mut invite = eligible();
        invite.is_active = false;
        invite.expired = true;
        let err = invite.check().unwrap_err();
        assert!(matches!(err, ApiError::Gone("Invite has been deactivated")));
    }

    #[test]
    fn capacity_is_terminal_even_when_active() {
        let mut invite = eligible();
        invite.max_uses = Some(1);
        invite.used_count = 1;
        let status = invite.check().unwrap_err().into_response().status();
        assert_eq!(status, StatusCode::GONE);
    }

    #[test]
    fn unlimited_invites_never_hit_capacity() {
        let mut invite = eligible();
        invite.max_uses = None;
        invite.used_count = 10_000;
        assert!(invite.check().is_ok());
    }

    #[test]
    fn existing_members_get_a_conflict() {
        let mut invite = eligible();
        invite.already_member = true;
        let status = invite.check().unwrap_err().into_response().status();
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
