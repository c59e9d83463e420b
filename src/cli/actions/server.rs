use crate::api;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub frontend_base_url: String,
    pub otp_ttl_minutes: i64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config =
        api::handlers::auth::AuthConfig::new(args.jwt_secret, args.frontend_base_url)
            .with_session_ttl_seconds(args.session_ttl_seconds)
            .with_otp_ttl_minutes(args.otp_ttl_minutes)
            .with_cookie_secure(args.cookie_secure);

    api::new(args.port, args.dsn, auth_config).await
}
