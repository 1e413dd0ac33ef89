//! Role checks that run before a handler body.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use common_auth::{AuthContext, Claims};
use common_http_errors::ApiError;

use crate::app::AppState;
use crate::store::UserStore;

/// Allows the request only when the token's email belongs to a stored admin.
pub async fn require_admin<S>(store: &S, claims: &Claims) -> Result<(), ApiError>
where
    S: UserStore + ?Sized,
{
    let Some(email) = claims.email() else {
        return Err(ApiError::forbidden());
    };
    match store.find_user_by_email(email).await? {
        Some(user) if user.is_admin() => Ok(()),
        _ => {
            tracing::debug!(email, "admin check denied");
            Err(ApiError::forbidden())
        }
    }
}

/// Allows the request only when `email` is the caller's own.
pub fn require_self(auth: &AuthContext, email: &str) -> Result<(), ApiError> {
    if auth.claims.is_subject(email) {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

/// A verified token whose owner is an admin.
///
/// Token verification happens first; the role lookup only runs for a valid token.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AdminContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        require_admin(state.store.as_ref(), &auth.claims)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(auth))
    }
}
