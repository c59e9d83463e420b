//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;

use crate::api::email::EmailSender;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    frontend_base_url: String,
    session_ttl_seconds: i64,
    otp_ttl_minutes: i64,
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString, frontend_base_url: String) -> Self {
        Self {
            jwt_secret,
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_minutes(mut self, minutes: i64) -> Self {
        self.otp_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub(crate) fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn otp_ttl_minutes(&self) -> i64 {
        self.otp_ttl_minutes
    }

    /// Cookies are marked secure when requested explicitly or when the
    /// frontend is served over HTTPS.
    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.cookie_secure || self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    notifier: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, notifier: Arc<dyn EmailSender>) -> Self {
        Self { config, notifier }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn EmailSender> {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogEmailSender;

    fn config(frontend: &str) -> AuthConfig {
        AuthConfig::new(SecretString::from("not-a-real-secret"), frontend.to_string())
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = config("http://localhost:3000");

        assert_eq!(config.frontend_base_url(), "http://localhost:3000");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(config.otp_ttl_minutes(), super::DEFAULT_OTP_TTL_MINUTES);
        assert!(!config.session_cookie_secure());

        let config = config
            .with_session_ttl_seconds(7 * 24 * 3600)
            .with_otp_ttl_minutes(5)
            .with_cookie_secure(true);

        assert_eq!(config.session_ttl_seconds(), 7 * 24 * 3600);
        assert_eq!(config.otp_ttl_minutes(), 5);
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn https_frontend_implies_secure_cookie() {
        assert!(config("https://cartmate.app").session_cookie_secure());
        assert!(!config("http://localhost:3000").session_cookie_secure());
    }

    #[test]
    fn auth_state_exposes_config() {
        let state = AuthState::new(config("https://cartmate.app"), Arc::new(LogEmailSender));
        assert_eq!(state.config().frontend_base_url(), "https://cartmate.app");
    }
}
