//! HS256 session tokens for counselor logins.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims carried by a counselor session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Counselor id.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Encoding and decoding keys plus the configured token lifetime. Cheap to
/// clone; shared with the extractor through router state.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    pub fn issue(&self, counselor_id: &str, email: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: counselor_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| AuthError::TokenCreation)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_and_carries_identity() {
        let keys = JwtKeys::new("test-secret", 60);
        let token = keys.issue("c-1", "ana@example.com").expect("token issues");
        let claims = keys.verify(&token).expect("token verifies");
        assert_eq!(claims.sub, "c-1");
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let keys = JwtKeys::new("test-secret", 60);
        let other = JwtKeys::new("other-secret", 60);
        let token = other.issue("c-1", "ana@example.com").expect("token issues");
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("test-secret", -120);
        let token = keys.issue("c-1", "ana@example.com").expect("token issues");
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = JwtKeys::new("test-secret", 60);
        assert!(matches!(
            keys.verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }
}
