//! API error type
//!
//! Domain failures become 4xx responses with a short machine-readable code;
//! storage and other infrastructure failures become 500 and are logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use wkune_common::Error as CommonError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Engine or storage error
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                CommonError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                CommonError::MemberNotFound(_) => (StatusCode::NOT_FOUND, "MEMBER_NOT_FOUND"),
                CommonError::ObserverForbidden(_) => (StatusCode::FORBIDDEN, "OBSERVER_FORBIDDEN"),
                CommonError::NotCreator(_) => (StatusCode::FORBIDDEN, "NOT_CREATOR"),
                CommonError::AlreadyReady => (StatusCode::CONFLICT, "ALREADY_READY"),
                CommonError::JoinConflict(_) => (StatusCode::CONFLICT, "JOIN_CONFLICT"),
                CommonError::WrongPhase(_) => (StatusCode::CONFLICT, "WRONG_PHASE"),
                CommonError::EmptyOrDuplicateItem => (StatusCode::BAD_REQUEST, "DUPLICATE_ITEM"),
                CommonError::IndexOutOfRange { .. } => (StatusCode::BAD_REQUEST, "INVALID_INDEX"),
                CommonError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                CommonError::Database(_)
                | CommonError::Serialization(_)
                | CommonError::Io(_)
                | CommonError::Config(_)
                | CommonError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let infrastructure = matches!(&self, ApiError::Common(err) if !err.is_domain());
        let message = if infrastructure {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CommonError::SessionNotFound("X".into()), StatusCode::NOT_FOUND),
            (CommonError::ObserverForbidden("add items"), StatusCode::FORBIDDEN),
            (CommonError::NotCreator("reroll"), StatusCode::FORBIDDEN),
            (CommonError::AlreadyReady, StatusCode::CONFLICT),
            (CommonError::WrongPhase("adding".into()), StatusCode::CONFLICT),
            (CommonError::EmptyOrDuplicateItem, StatusCode::BAD_REQUEST),
            (
                CommonError::IndexOutOfRange { index: 3, len: 1 },
                StatusCode::BAD_REQUEST,
            ),
            (CommonError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
