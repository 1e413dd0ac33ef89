use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("token verification failed: {0}")]
    InvalidToken(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("token claims must be a JSON object, got {0}")]
    InvalidClaims(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable machine-readable code, also sent as `X-Error-Code`.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorization => "unauthenticated",
            AuthError::InvalidAuthorization => "invalid_authorization",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::InvalidClaim(_, _) | AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::Signing(_) => "token_signing",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorization
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::InvalidClaim(_, _) | AuthError::InvalidClaims(_) => StatusCode::BAD_REQUEST,
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(value.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = ErrorBody {
            error: true,
            code,
            message: self.to_string(),
        };
        let mut resp = (status, Json(body)).into_response();
        resp.headers_mut()
            .insert("X-Error-Code", axum::http::HeaderValue::from_static(code));
        resp
    }
}
