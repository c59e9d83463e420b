//! HS256 session tokens.
//!
//! Tokens carry the user's id, email, and username plus `iat`/`nbf`/`exp`.
//! Signing and verification are deterministic given the secret; verification
//! returns a typed error so callers can log the reason without leaking it.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

const HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("token is not three dot-separated segments")]
    Format,
    #[error("token segment is not valid base64url")]
    Base64,
    #[error("token segment is not valid JSON")]
    Json,
    #[error("unsupported signing algorithm")]
    Algorithm,
    #[error("signature mismatch")]
    Signature,
    #[error("token has expired")]
    TokenExpired,
    #[error("token is not yet valid")]
    NotYetValid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn new(id: Uuid, email: String, username: String, now: i64, ttl_seconds: i64) -> Self {
        Self {
            id,
            email,
            username,
            iat: now,
            nbf: now,
            exp: now + ttl_seconds,
        }
    }
}

/// Sign claims into a compact HS256 token.
///
/// # Errors
/// Returns an error if the claims fail to serialize or the secret is empty.
pub fn sign(claims: &Claims, secret: &SecretString) -> Result<String, Error> {
    let payload = serde_json::to_vec(claims).map_err(|_| Error::Json)?;
    let mut token = format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(HEADER),
        Base64UrlUnpadded::encode_string(&payload)
    );

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| Error::Signature)?;
    mac.update(token.as_bytes());
    let tag = mac.finalize().into_bytes();

    token.push('.');
    token.push_str(&Base64UrlUnpadded::encode_string(&tag));
    Ok(token)
}

/// Verify a compact HS256 token and return its claims.
///
/// `now` is seconds since the Unix epoch; `nbf <= now < exp` must hold.
///
/// # Errors
/// Returns a typed error describing the first check that failed.
pub fn verify(token: &str, secret: &SecretString, now: i64) -> Result<Claims, Error> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::Format);
    };

    let header_json = Base64UrlUnpadded::decode_vec(header).map_err(|_| Error::Base64)?;
    let header_value: serde_json::Value =
        serde_json::from_slice(&header_json).map_err(|_| Error::Json)?;
    if header_value.get("alg").and_then(serde_json::Value::as_str) != Some("HS256") {
        return Err(Error::Algorithm);
    }

    let tag = Base64UrlUnpadded::decode_vec(signature).map_err(|_| Error::Base64)?;
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| Error::Signature)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&tag).map_err(|_| Error::Signature)?;

    let payload_json = Base64UrlUnpadded::decode_vec(payload).map_err(|_| Error::Base64)?;
    let claims: Claims = serde_json::from_slice(&payload_json).map_err(|_| Error::Json)?;

    if now < claims.nbf {
        return Err(Error::NotYetValid);
    }
    if now >= claims.exp {
        return Err(Error::TokenExpired);
    }

    Ok(claims)
}

/// Parse a duration string like `24h`, `7d`, `30m`, or `45s` into seconds.
///
/// A bare number is taken as seconds. Anything unparseable falls back to the
/// 24 hour default.
#[must_use]
pub fn parse_expiry(expiry: &str) -> i64 {
    let trimmed = expiry.trim();
    let (digits, unit) = match trimmed.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => trimmed.split_at(pos),
        None => (trimmed, "s"),
    };

    let Ok(value) = digits.parse::<i64>() else {
        return DEFAULT_SESSION_TTL_SECONDS;
    };
    if value <= 0 {
        return DEFAULT_SESSION_TTL_SECONDS;
    }

    let seconds = match unit {
        "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(60 * 60),
        "d" => value.checked_mul(24 * 60 * 60),
        _ => None,
    };
    seconds.unwrap_or(DEFAULT_SESSION_TTL_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn secret() -> SecretString {
        SecretString::from("test-secret")
    }

    fn claims() -> Claims {
        Claims::new(
            Uuid::parse_str("11111111-2222-3333-4444-555555555555").expect("uuid"),
            "alice@example.com".to_string(),
            "alice".to_string(),
            NOW,
            DEFAULT_SESSION_TTL_SECONDS,
        )
    }

    #[test]
    fn sign_is_deterministic() -> Result<(), Error> {
        // Pinned vector: any change to header, field order, or encoding shows up here.
        let token = sign(&claims(), &secret())?;
        assert_eq!(
            token,
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
             eyJpZCI6IjExMTExMTExLTIyMjItMzMzMy00NDQ0LTU1NTU1NTU1NTU1NSIsImVtYWlsIjoiYWxpY2VAZXhhbXBsZS5jb20iLCJ1c2VybmFtZSI6ImFsaWNlIiwiaWF0IjoxNzAwMDAwMDAwLCJuYmYiOjE3MDAwMDAwMDAsImV4cCI6MTcwMDA4NjQwMH0.\
             GA7AIRvbDaOAR4-CGIH9LhPtvDDGS79X-eGI2FZ-wWY"
        );
        Ok(())
    }

    #[test]
    fn sign_then_verify_round_trips() -> Result<(), Error> {
        let token = sign(&claims(), &secret())?;
        let decoded = verify(&token, &secret(), NOW + 60)?;
        assert_eq!(decoded, claims());
        Ok(())
    }

    #[test]
    fn tampered_payload_fails_signature() -> Result<(), Error> {
        let token = sign(&claims(), &secret())?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = Base64UrlUnpadded::encode_string(
            br#"{"id":"11111111-2222-3333-4444-555555555555","email":"mallory@example.com","username":"alice","iat":1700000000,"nbf":1700000000,"exp":1700086400}"#,
        );
        parts[1] = &forged;
        let forged_token = parts.join(".");
        assert_eq!(
            verify(&forged_token, &secret(), NOW + 60),
            Err(Error::Signature)
        );
        Ok(())
    }

    #[test]
    fn wrong_secret_fails_signature() -> Result<(), Error> {
        let token = sign(&claims(), &secret())?;
        assert_eq!(
            verify(&token, &SecretString::from("other-secret"), NOW + 60),
            Err(Error::Signature)
        );
        Ok(())
    }

    #[test]
    fn expiry_window_is_enforced() -> Result<(), Error> {
        let token = sign(&claims(), &secret())?;
        assert_eq!(
            verify(&token, &secret(), NOW + DEFAULT_SESSION_TTL_SECONDS),
            Err(Error::TokenExpired)
        );
        assert_eq!(verify(&token, &secret(), NOW - 1), Err(Error::NotYetValid));
        assert!(verify(&token, &secret(), NOW).is_ok());
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_typed_errors() {
        assert_eq!(verify("nodots", &secret(), NOW), Err(Error::Format));
        assert_eq!(verify("a.b.c.d", &secret(), NOW), Err(Error::Format));
        assert_eq!(verify("!!.??.++", &secret(), NOW), Err(Error::Base64));
    }

    #[test]
    fn foreign_algorithm_is_rejected() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = Base64UrlUnpadded::encode_string(b"{}");
        let token = format!("{header}.{payload}.{}", Base64UrlUnpadded::encode_string(b""));
        assert_eq!(verify(&token, &secret(), NOW), Err(Error::Algorithm));
    }

    #[test]
    fn parse_expiry_units() {
        assert_eq!(parse_expiry("24h"), 86_400);
        assert_eq!(parse_expiry("7d"), 604_800);
        assert_eq!(parse_expiry("30m"), 1_800);
        assert_eq!(parse_expiry("45s"), 45);
        assert_eq!(parse_expiry("900"), 900);
        assert_eq!(parse_expiry(" 12h "), 43_200);
    }

    #[test]
    fn parse_expiry_falls_back_to_default() {
        assert_eq!(parse_expiry(""), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(parse_expiry("soon"), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(parse_expiry("12w"), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(parse_expiry("0h"), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(parse_expiry("-5m"), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            parse_expiry("99999999999999999d"),
            DEFAULT_SESSION_TTL_SECONDS
        );
    }
}
