//! Identity-provider tokens.
//!
//! The provider issues HS256 JWTs whose `sub` (or `userId`) claim is the
//! stable user id. Tokens arrive in the `auth_token` cookie or as a bearer
//! `Authorization` header.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const AUTH_COOKIE_NAME: &str = "auth_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("missing JWT_SECRET")]
    MissingSecret,
    #[error("invalid expiry: {0}")]
    InvalidExpiresIn(String),
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| AuthError::InvalidToken)
}

fn mac_for(secret: &str) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)
}

/// Checks signature, algorithm and the `exp`/`nbf` window against `now`.
pub fn verify_jwt_hs256(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header_json: serde_json::Value =
        serde_json::from_slice(&decode_segment(header_b64)?).map_err(|_| AuthError::InvalidToken)?;
    if header_json.get("alg").and_then(|value| value.as_str()) != Some("HS256") {
        return Err(AuthError::InvalidToken);
    }

    let mut mac = mac_for(secret)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&decode_segment(sig_b64)?)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload: serde_json::Value =
        serde_json::from_slice(&decode_segment(payload_b64)?).map_err(|_| AuthError::InvalidToken)?;
    validate_time_claims(&payload, now.timestamp())?;

    let user_id = ["sub", "userId"]
        .iter()
        .find_map(|claim| payload.get(*claim).and_then(|value| value.as_str()))
        .filter(|value| !value.trim().is_empty())
        .ok_or(AuthError::InvalidToken)?;

    Ok(Identity {
        user_id: user_id.to_string(),
    })
}

fn validate_time_claims(payload: &serde_json::Value, now: i64) -> Result<(), AuthError> {
    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::Expired);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

/// Issues a token the way the identity provider does. Used by local tooling
/// and tests.
pub fn sign_jwt_for_user(
    user_id: &str,
    secret: &str,
    expires_in: &str,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let expires_in_ms = parse_expires_in_ms(expires_in)?;
    let exp = now
        .checked_add_signed(chrono::Duration::milliseconds(expires_in_ms))
        .ok_or_else(|| AuthError::InvalidExpiresIn(expires_in.to_string()))?;

    let header_json = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
    let payload_json = serde_json::json!({
        "sub": user_id,
        "iat": now.timestamp(),
        "exp": exp.timestamp(),
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header_json.to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.to_string());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{sig_b64}"))
}

/// Parses durations such as `30s`, `15m`, `24h` or `7d` into milliseconds.
pub fn parse_expires_in_ms(value: &str) -> Result<i64, AuthError> {
    let invalid = || AuthError::InvalidExpiresIn(value.to_string());
    let trimmed = value.trim();
    if trimmed.len() < 2 || !trimmed.is_char_boundary(trimmed.len() - 1) {
        return Err(invalid());
    }

    let (digits, unit) = trimmed.split_at(trimmed.len() - 1);
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let unit_ms = match unit {
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        "d" => 24 * 60 * 60 * 1000,
        _ => return Err(invalid()),
    };
    amount.checked_mul(unit_ms).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, TimeZone};

    const SECRET: &str = "test-secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn signed_token_round_trips_to_identity() {
        let token = sign_jwt_for_user("user-1", SECRET, "1h", now()).unwrap();
        let identity = verify_jwt_hs256(&token, SECRET, now()).unwrap();
        assert_eq!(identity.user_id, "user-1");
    }

    #[test]
    fn wrong_secret_and_tampering_are_rejected() {
        let token = sign_jwt_for_user("user-1", SECRET, "1h", now()).unwrap();
        assert_eq!(
            verify_jwt_hs256(&token, "other", now()),
            Err(AuthError::InvalidToken)
        );
        let tampered = token.replacen('.', ".x", 1);
        assert!(verify_jwt_hs256(&tampered, SECRET, now()).is_err());
        assert!(verify_jwt_hs256("a.b", SECRET, now()).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_jwt_for_user("user-1", SECRET, "1h", now()).unwrap();
        let later = now() + Duration::hours(2);
        assert_eq!(verify_jwt_hs256(&token, SECRET, later), Err(AuthError::Expired));
    }

    #[test]
    fn legacy_user_id_claim_is_accepted() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"userId":"legacy"}"#);
        let mut mac = mac_for(SECRET).unwrap();
        mac.update(format!("{header}.{payload}").as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        let token = format!("{header}.{payload}.{sig}");
        assert_eq!(
            verify_jwt_hs256(&token, SECRET, now()).unwrap().user_id,
            "legacy"
        );
    }

    #[test]
    fn expires_in_units() {
        assert_eq!(parse_expires_in_ms("30s"), Ok(30_000));
        assert_eq!(parse_expires_in_ms("2h"), Ok(7_200_000));
        assert_eq!(parse_expires_in_ms("1d"), Ok(86_400_000));
        assert!(parse_expires_in_ms("0h").is_err());
        assert!(parse_expires_in_ms("h").is_err());
        assert!(parse_expires_in_ms("5w").is_err());
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; broken; auth_token=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }
}
