use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id.
    pub sub: String,
    /// Session id; the server keeps one session row per issued token.
    pub jti: String,
    pub exp: i64,
    pub role: Role,
    pub family_id: String,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

pub fn decode_unverified(token: &str) -> Result<JwtClaims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() < 2 {
        return Err(JwtError::Decode("invalid JWT format".into()));
    }
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| JwtError::Decode(format!("invalid base64 payload: {e}")))?;
    serde_json::from_slice::<JwtClaims>(&payload_bytes)
        .map_err(|e| JwtError::Decode(format!("invalid json payload: {e}")))
}

pub fn decode_and_verify(token: &str, secret: &[u8]) -> Result<JwtClaims, JwtError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

pub fn encode(claims: &JwtClaims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> JwtClaims {
        JwtClaims {
            sub: "user-1".into(),
            jti: "session-1".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
            role: Role::Child,
            family_id: "fam-1".into(),
        }
    }

    #[test]
    fn verified_decode_returns_claims() {
        let token = encode(&claims(), b"secret").unwrap();
        let back = decode_and_verify(&token, b"secret").unwrap();
        assert_eq!(back.sub, "user-1");
        assert_eq!(back.role, Role::Child);
        assert_eq!(back.family_id, "fam-1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode(&claims(), b"secret").unwrap();
        assert!(decode_and_verify(&token, b"other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut c = claims();
        c.exp = chrono::Utc::now().timestamp() - 3600;
        let token = encode(&c, b"secret").unwrap();
        assert!(decode_and_verify(&token, b"secret").is_err());
    }

    #[test]
    fn unverified_decode_reads_payload() {
        let token = encode(&claims(), b"secret").unwrap();
        let back = decode_unverified(&token).unwrap();
        assert_eq!(back.jti, "session-1");
        assert!(decode_unverified("not-a-token").is_err());
    }
}
