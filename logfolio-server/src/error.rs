//! HTTP error type for the Logfolio API.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API handler errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Common(#[from] logfolio_common::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn stock_not_found(id: &str) -> Self {
        Self::NotFound(format!("Stock {id}"))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Common(err) => match err.status_code() {
                404 => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                400 => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = ApiError::stock_not_found("stock_1");
        assert_eq!(err.to_string(), "Stock stock_1 not found");
    }

    #[test_case(ApiError::invalid("missing ticker"), StatusCode::BAD_REQUEST ; "invalid request")]
    #[test_case(ApiError::NotFound("Strategy s1".into()), StatusCode::NOT_FOUND ; "not found")]
    #[test_case(ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR ; "internal")]
    #[test_case(
        ApiError::Common(logfolio_common::Error::InvalidInput("Unknown strategy: x".into())),
        StatusCode::BAD_REQUEST ;
        "common invalid input"
    )]
    #[test_case(
        ApiError::Common(logfolio_common::Error::Storage("locked".into())),
        StatusCode::INTERNAL_SERVER_ERROR ;
        "common storage"
    )]
    fn test_error_into_response(err: ApiError, expected: StatusCode) {
        assert_eq!(err.into_response().status(), expected);
    }
}
