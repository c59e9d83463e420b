//! Database helpers for users and verification codes.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::principal::CurrentUser;
use crate::api::handlers::error::is_unique_violation;

const USER_COLUMNS: &str = r#"id, username, email, avatar_url, is_email_verified,
        to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at"#;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(CurrentUser),
    EmailTaken,
    UsernameTaken,
}

/// Outcome of checking a verification code.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum VerifyOutcome {
    Verified,
    InvalidCode,
    Expired,
    /// Promoting a pending email collided with an existing account.
    EmailTaken,
}

/// Login lookup result; the only place the password hash leaves the table.
pub(super) struct LoginRecord {
    pub(super) user: CurrentUser,
    pub(super) password_hash: String,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> CurrentUser {
    CurrentUser {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        avatar_url: row.get("avatar_url"),
        is_email_verified: row.get("is_email_verified"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<CurrentUser>> {
    let query = &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch user by id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Look up login data by normalized email.
pub(super) async fn find_login_record(pool: &PgPool, email: &str) -> Result<Option<LoginRecord>> {
    let query = &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch login record")?;

    Ok(row.map(|row| LoginRecord {
        user: user_from_row(&row),
        password_hash: row.get("password_hash"),
    }))
}

pub(super) async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = &format!(
        r"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(user_from_row(&row))),
        Err(err) if is_unique_violation(&err, "users_email_key") => Ok(SignupOutcome::EmailTaken),
        Err(err) if is_unique_violation(&err, "users_username_key") => {
            Ok(SignupOutcome::UsernameTaken)
        }
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Issue a fresh verification code, invalidating any outstanding unused codes.
pub(super) async fn issue_otp(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    code: &str,
    ttl_minutes: i64,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin otp transaction")?;

    let delete = "DELETE FROM otp_codes WHERE user_id = $1 AND used = false";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = delete
    );
    sqlx::query(delete)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete unused codes")?;

    let insert = r"
        INSERT INTO otp_codes (user_id, email, code, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 minute'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = insert
    );
    sqlx::query(insert)
        .bind(user_id)
        .bind(email)
        .bind(code)
        .bind(ttl_minutes)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert verification code")?;

    let stamp = "UPDATE users SET verification_sent_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = stamp
    );
    sqlx::query(stamp)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to record verification timestamp")?;

    tx.commit().await.context("commit otp transaction")?;

    Ok(())
}

/// Check a submitted code and, when it matches, mark the user verified in the
/// same transaction. A code sent to a pending address promotes that address.
pub(super) async fn verify_otp(pool: &PgPool, user_id: Uuid, code: &str) -> Result<VerifyOutcome> {
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    let select = r"
        SELECT id, email, expires_at <= NOW() AS expired
        FROM otp_codes
        WHERE user_id = $1 AND code = $2 AND used = false
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = select
    );
    let row = sqlx::query(select)
        .bind(user_id)
        .bind(code)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to fetch verification code")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(VerifyOutcome::InvalidCode);
    };

    // An expired row stays unused so the failure is observable.
    if row.get::<bool, _>("expired") {
        let _ = tx.rollback().await;
        return Ok(VerifyOutcome::Expired);
    }

    let code_id: Uuid = row.get("id");
    let code_email: String = row.get("email");

    let mark_used = "UPDATE otp_codes SET used = true WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = mark_used
    );
    sqlx::query(mark_used)
        .bind(code_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to mark code used")?;

    let flip = r"
        UPDATE users
        SET is_email_verified = true,
            email = CASE WHEN pending_email = $2 THEN pending_email ELSE email END,
            pending_email = CASE WHEN pending_email = $2 THEN NULL ELSE pending_email END,
            verification_sent_at = CASE WHEN pending_email = $2 THEN NULL ELSE verification_sent_at END,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = flip
    );
    if let Err(err) = sqlx::query(flip)
        .bind(user_id)
        .bind(&code_email)
        .execute(&mut *tx)
        .instrument(span)
        .await
    {
        if is_unique_violation(&err, "users_email_key") {
            let _ = tx.rollback().await;
            return Ok(VerifyOutcome::EmailTaken);
        }
        return Err(err).context("failed to mark user verified");
    }

    tx.commit().await.context("commit verify transaction")?;

    Ok(VerifyOutcome::Verified)
}

/// Allow-listed profile updates; `None` fields stay untouched. The avatar is
/// nullable, so its patch distinguishes "clear" (`Some(None)`) from "keep".
#[derive(Debug, Default)]
pub(crate) struct ProfilePatch {
    pub(crate) username: Option<String>,
    /// Recorded as `pending_email` until the new address is verified.
    pub(crate) email: Option<String>,
    pub(crate) avatar_url: Option<Option<String>>,
}

#[derive(Debug)]
pub(crate) enum ProfileOutcome {
    Updated(CurrentUser),
    EmailTaken,
    UsernameTaken,
    NotFound,
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    patch: &ProfilePatch,
) -> Result<ProfileOutcome> {
    if let Some(email) = &patch.email {
        if email_in_use(pool, email, user_id).await? {
            return Ok(ProfileOutcome::EmailTaken);
        }
    }

    let query = &format!(
        r"
        UPDATE users
        SET username = COALESCE($2, username),
            pending_email = COALESCE($3, pending_email),
            avatar_url = CASE WHEN $4 THEN $5 ELSE avatar_url END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(&patch.username)
        .bind(&patch.email)
        .bind(patch.avatar_url.is_some())
        .bind(patch.avatar_url.as_ref().and_then(Option::as_deref))
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(ProfileOutcome::Updated(user_from_row(&row))),
        Ok(None) => Ok(ProfileOutcome::NotFound),
        Err(err) if is_unique_violation(&err, "users_username_key") => {
            Ok(ProfileOutcome::UsernameTaken)
        }
        Err(err) => Err(err).context("failed to update profile"),
    }
}

async fn email_in_use(pool: &PgPool, email: &str, not_user: Uuid) -> Result<bool> {
    let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2) AS exists";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(not_user)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to check email availability")?;

    Ok(row.get("exists"))
}

/// The address a verification code should go to: the pending email when an
/// address change is in flight, otherwise the current one.
pub(super) async fn otp_target_email(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT COALESCE(pending_email, email) AS target FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to resolve verification address")?;

    Ok(row.map(|row| row.get("target")))
}

pub(crate) async fn fetch_password_hash(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch password hash")?;

    Ok(row.map(|row| row.get("password_hash")))
}

pub(crate) async fn update_password(pool: &PgPool, user_id: Uuid, new_hash: &str) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(new_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(())
}

/// Delete the account; lists, memberships, and codes cascade.
pub(crate) async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}
