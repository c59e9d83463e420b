//! # Cartmate (Collaborative Shopping Lists)
//!
//! `cartmate` is the backend for a collaborative shopping-list application:
//! user accounts, shared lists, list chat, item management, and invite-based
//! sharing.
//!
//! ## Authentication
//!
//! Sessions are stateless: a login or registration mints an HS256-signed JWT
//! carrying `{id, email, username}` plus `iat`/`nbf`/`exp`, delivered in an
//! `HttpOnly` cookie. There is no server-side session table, so a token stays
//! valid until its expiry; logout only clears the cookie.
//!
//! Email ownership is proven with 6-digit one-time codes (OTP). A code lives
//! for 10 minutes and is consumed exactly once; issuing a new code deletes any
//! unused predecessors so only the most recent code is ever valid.
//!
//! ## Authorization & Membership
//!
//! Every list-scoped request resolves the caller from the session cookie and
//! then checks the `(list, user)` membership row. Roles are `CREATOR`,
//! `EDITOR`, and `VIEWER`; each list has exactly one immutable `CREATOR`,
//! enrolled at list creation. Invites are capability tokens: possession lets
//! an authenticated user preview the list and join as `EDITOR`, subject to
//! the invite's expiry, capacity, and active flag.

pub mod api;
pub mod cli;
#[cfg(test)]
pub(crate) mod test_support;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }

    // Normalize SQL to avoid brittle formatting checks in schema tests.
    fn canonicalize_sql(sql: &str) -> String {
        sql.chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_lowercase())
            .collect()
    }

    fn canonical_sql(path: &Path) -> Result<String> {
        let sql = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file at {}", path.display()))?;
        Ok(canonicalize_sql(&sql))
    }

    fn assert_contains(path: &Path, canonical: &str, needle: &str) -> Result<()> {
        ensure!(
            canonical.contains(needle),
            "Expected {needle} is missing in {}",
            path.display()
        );
        Ok(())
    }

    // Smoke-test the bootstrap schema so queries and constraints stay aligned.
    #[test]
    fn schema_sql_integrity() -> Result<()> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("db/sql/01_cartmate.sql");
        let canonical = canonical_sql(&path)?;

        // Unique-violation handling keys off these constraint names.
        assert_contains(&path, &canonical, "constraintusers_email_keyunique(email)")?;
        assert_contains(
            &path,
            &canonical,
            "constraintusers_username_keyunique(username)",
        )?;
        assert_contains(
            &path,
            &canonical,
            "constraintlist_members_list_id_user_id_keyunique(list_id,user_id)",
        )?;
        assert_contains(&path, &canonical, "constraintinvites_token_keyunique(token)")?;

        // Destroying a list must cascade to its dependents.
        assert_contains(&path, &canonical, "referenceslists(id)ondeletecascade")
    }
}
