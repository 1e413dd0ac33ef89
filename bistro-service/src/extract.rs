use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use common_http_errors::ApiError;
use serde::de::DeserializeOwned;
use tracing::debug;

/// JSON body extractor whose rejection is a tagged `invalid_body` error
/// instead of axum's plain-text 4xx.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "rejected request body");
                Err(ApiError::bad_request("invalid_body", Some(rejection.body_text())))
            }
        }
    }
}
