//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::api::handlers::auth::jwt;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;

    let session_ttl_seconds = matches
        .get_one::<String>(auth::ARG_JWT_EXPIRY)
        .map_or(jwt::DEFAULT_SESSION_TTL_SECONDS, |expiry| {
            jwt::parse_expiry(expiry)
        });

    let frontend_base_url = matches
        .get_one::<String>(auth::ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    let otp_ttl_minutes = matches
        .get_one::<i64>(auth::ARG_OTP_TTL_MINUTES)
        .copied()
        .unwrap_or(10);

    let cookie_secure = matches.get_flag(auth::ARG_COOKIE_SECURE);

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: SecretString::from(jwt_secret),
        session_ttl_seconds,
        frontend_base_url,
        otp_ttl_minutes,
        cookie_secure,
    }))
}
