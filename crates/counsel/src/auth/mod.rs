//! Counselor authentication: password hashing, session tokens, and the
//! request extractor used by protected routes.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::store_error_response;
use crate::store::StoreError;

pub mod extract;
pub mod jwt;
pub mod password;
pub mod service;

pub use extract::AuthenticatedCounselor;
pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, LoginOutcome, NewCounselor};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to issue token")]
    TokenCreation,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials
            | AuthError::InvalidToken => {
                let payload = json!({
                    "error": self.to_string(),
                });
                (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    axum::Json(payload),
                )
                    .into_response()
            }
            AuthError::TokenCreation => {
                let payload = json!({
                    "error": self.to_string(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
            }
            AuthError::Store(error) => store_error_response(&error),
        }
    }
}
