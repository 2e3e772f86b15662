//! Request extractor that turns a bearer token into a counselor identity.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::jwt::JwtKeys;
use super::AuthError;

/// The counselor authenticated by the request's bearer token. Handlers that
/// take this as an argument reject unauthenticated requests with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedCounselor {
    pub counselor_id: String,
    pub email: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCounselor
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingCredentials)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token)?;
        Ok(AuthenticatedCounselor {
            counselor_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/dashboard/stats");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).expect("request builds").into_parts();
        parts
    }

    #[tokio::test]
    async fn valid_bearer_token_yields_the_counselor() {
        let keys = JwtKeys::new("test-secret", 60);
        let token = keys.issue("c-1", "ana@example.com").expect("token issues");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));

        let counselor = AuthenticatedCounselor::from_request_parts(&mut parts, &keys)
            .await
            .expect("extraction succeeds");
        assert_eq!(counselor.counselor_id, "c-1");
        assert_eq!(counselor.email, "ana@example.com");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let keys = JwtKeys::new("test-secret", 60);
        let mut parts = parts_with_auth(None);
        let result = AuthenticatedCounselor::from_request_parts(&mut parts, &keys).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let keys = JwtKeys::new("test-secret", 60);
        let mut parts = parts_with_auth(Some("Basic YW5hOnB3"));
        let result = AuthenticatedCounselor::from_request_parts(&mut parts, &keys).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let keys = JwtKeys::new("test-secret", 60);
        let other = JwtKeys::new("other-secret", 60);
        let token = other.issue("c-1", "ana@example.com").expect("token issues");
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let result = AuthenticatedCounselor::from_request_parts(&mut parts, &keys).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
