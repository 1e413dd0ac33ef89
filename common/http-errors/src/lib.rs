use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Body shape shared by every failure: clients test `error` rather than the status.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: bool,
    pub code: String,
    pub message: String,
}

/// Which collaborator a fault came from; decides 500 vs 502.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Store,
    PaymentProvider,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated { message: String },
    InvalidToken { message: String },
    Forbidden { message: Option<String> },
    BadRequest { code: &'static str, message: Option<String> },
    NotFound { code: &'static str },
    Upstream { source: Upstream, message: String },
}

impl ApiError {
    pub fn forbidden() -> Self { Self::Forbidden { message: None } }
    pub fn bad_request(code: &'static str, message: Option<String>) -> Self { Self::BadRequest { code, message } }
    pub fn store<E: std::fmt::Display>(e: E) -> Self { Self::Upstream { source: Upstream::Store, message: e.to_string() } }
    pub fn gateway<E: std::fmt::Display>(e: E) -> Self { Self::Upstream { source: Upstream::PaymentProvider, message: e.to_string() } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } | ApiError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream { source: Upstream::Store, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { source: Upstream::PaymentProvider, .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::InvalidToken { .. } => "invalid_token",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::BadRequest { code, .. } | ApiError::NotFound { code } => *code,
            ApiError::Upstream { source: Upstream::Store, .. } => "store_error",
            ApiError::Upstream { source: Upstream::PaymentProvider, .. } => "payment_provider_error",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated { message } | ApiError::InvalidToken { message } => message.clone(),
            ApiError::Forbidden { message } => message.clone().unwrap_or_else(|| "Forbidden".into()),
            ApiError::BadRequest { code, message } => message.clone().unwrap_or_else(|| (*code).into()),
            ApiError::NotFound { code } => (*code).into(),
            ApiError::Upstream { message, .. } => message.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let body = ErrorBody { error: true, code: error_code.into(), message: self.message() };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Older clients only look at the JSON body, so every tagged error except
/// 401/403 is reported with 200. Responses without `X-Error-Code` pass through.
pub fn downgrade_legacy_status(mut resp: Response) -> Response {
    let status = resp.status();
    let tagged = resp.headers().contains_key(ERROR_CODE_HEADER);
    let auth_failure = status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
    if tagged && !auth_failure && (status.is_client_error() || status.is_server_error()) {
        *resp.status_mut() = StatusCode::OK;
    }
    resp
}

/// `axum::middleware::map_response` adapter for [`downgrade_legacy_status`].
pub async fn legacy_status(resp: Response) -> Response {
    downgrade_legacy_status(resp)
}
