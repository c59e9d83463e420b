//! Stateless session cookie adapter.
//!
//! The session is the signed token itself; nothing is stored server-side.
//! Logout therefore only clears the cookie.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::{
    jwt::{self, Claims},
    principal::require_auth,
    state::{AuthConfig, AuthState},
    types::UserResponse,
};

pub const SESSION_COOKIE_NAME: &str = "cartmate_token";

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "User no longer exists")
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Always clear the cookie; there is no server-side session to delete.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Extract and verify the session token, returning its claims.
///
/// Returns `None` for missing, malformed, or out-of-window tokens; the
/// rejection reason is logged at debug level only.
pub(crate) fn current_claims(headers: &HeaderMap, config: &AuthConfig) -> Option<Claims> {
    let token = extract_session_token(headers)?;
    let now = chrono::Utc::now().timestamp();
    match jwt::verify(&token, config.jwt_secret(), now) {
        Ok(claims) => Some(claims),
        Err(err) => {
            debug!("Rejected session token: {err}");
            None
        }
    }
}

/// Build the `HttpOnly` session cookie carrying the signed token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(
    config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next().map(str::trim);
        // A pair without '=' is malformed; skip it and keep scanning.
        let Some(val) = parts.next().map(str::trim) else {
            continue;
        };
        if key == Some(SESSION_COOKIE_NAME) {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("test-secret"),
            "http://localhost:3000".to_string(),
        )
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).expect("cookie"));
        headers
    }

    #[test]
    fn session_cookie_attributes() -> Result<(), InvalidHeaderValue> {
        let cookie = session_cookie(&config(), "token-value")?;
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("cartmate_token=token-value"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));
        Ok(())
    }

    #[test]
    fn https_frontend_gets_secure_cookie() -> Result<(), InvalidHeaderValue> {
        let config = AuthConfig::new(
            SecretString::from("test-secret"),
            "https://cartmate.app".to_string(),
        );
        let cookie = session_cookie(&config, "token-value")?;
        assert!(cookie.to_str().expect("ascii").ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookie_zeroes_max_age() -> Result<(), InvalidHeaderValue> {
        let cookie = clear_session_cookie(&config())?;
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("cartmate_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn extracts_token_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; cartmate_token=abc.def.ghi; lang=en");
        assert_eq!(
            extract_session_token(&headers),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn malformed_pairs_do_not_hide_the_token() {
        let headers = headers_with_cookie("junk; cartmate_token=abc.def.ghi");
        assert_eq!(
            extract_session_token(&headers),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn current_claims_round_trips_signed_token() {
        let config = config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::new(
            Uuid::new_v4(),
            "alice@example.com".to_string(),
            "alice".to_string(),
            now,
            3600,
        );
        let token = jwt::sign(&claims, config.jwt_secret()).expect("sign");
        let headers = headers_with_cookie(&format!("cartmate_token={token}"));
        assert_eq!(current_claims(&headers, &config), Some(claims));
    }

    #[test]
    fn current_claims_rejects_garbage() {
        let headers = headers_with_cookie("cartmate_token=not.a.token");
        assert_eq!(current_claims(&headers, &config()), None);
    }
}
