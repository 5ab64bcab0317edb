use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use super::SessionError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys for admin session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(expiration_hours),
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        self.sign(&Claims {
            user_id,
            email: email.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), claims, &self.encoding)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => SessionError::ExpiredToken,
                    _ => SessionError::InvalidToken,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn issued_tokens_validate() {
        let keys = SessionKeys::new(SECRET, 168);
        let token = keys.issue(42, "owner@example.com").unwrap();

        let claims = keys.validate(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "owner@example.com");
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn expired_tokens_are_told_apart() {
        let keys = SessionKeys::new(SECRET, 168);
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                user_id: 42,
                email: "owner@example.com".into(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        assert!(matches!(
            keys.validate(&token),
            Err(SessionError::ExpiredToken)
        ));
    }

    #[test]
    fn foreign_signatures_and_garbage_are_invalid() {
        let keys = SessionKeys::new(SECRET, 168);
        let other = SessionKeys::new("another-secret-that-is-long-enough-too", 168);
        let token = other.issue(42, "owner@example.com").unwrap();

        assert!(matches!(
            keys.validate(&token),
            Err(SessionError::InvalidToken)
        ));
        assert!(matches!(
            keys.validate("not.a.jwt"),
            Err(SessionError::InvalidToken)
        ));
    }
}
