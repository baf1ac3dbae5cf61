//! Read-only inspection of JWT access tokens. Signatures are not verified;
//! this is only used to report expiry before hitting the API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};

pub fn decode_jwt_payload(token: &str) -> Option<serde_json::Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| tracing::debug!("Failed to decode JWT payload: {}", e))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_jwt_payload(token)?.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// `None` when the token carries no readable `exp` claim.
pub fn is_jwt_expired(token: &str, now: DateTime<Utc>) -> Option<bool> {
    jwt_expiry(token).map(|exp| now > exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_payload() {
        let token = token_with(&serde_json::json!({"sub": "7", "exp": 1_700_000_000}));
        let payload = decode_jwt_payload(&token).unwrap();
        assert_eq!(payload["sub"], "7");
        assert_eq!(jwt_expiry(&token).unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_expiry_check() {
        let token = token_with(&serde_json::json!({"exp": 1_700_000_000}));
        let before = DateTime::from_timestamp(1_699_999_000, 0).unwrap();
        let after = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        assert_eq!(is_jwt_expired(&token, before), Some(false));
        assert_eq!(is_jwt_expired(&token, after), Some(true));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(decode_jwt_payload("not-a-jwt").is_none());
        assert!(decode_jwt_payload("a.%%%.c").is_none());
        let no_exp = token_with(&serde_json::json!({"sub": "7"}));
        assert!(is_jwt_expired(&no_exp, Utc::now()).is_none());
    }
}
