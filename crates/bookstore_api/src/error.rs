//! HTTP error mapping.
//!
//! # Responsibility
//! - Turn service failures and extractor rejections into one JSON error body.
//!
//! # Invariants
//! - Storage failures never leak their message to clients.
//! - The rendered body is also stored in the response extensions so the
//!   request middleware can stamp `path` and `timestamp`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookstore_core::{FieldViolation, RepoError, ServiceError};
use log::{error, warn};
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const ROUTE_NOT_FOUND: &str = "ROUTE_NOT_FOUND";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: i64,
    pub status: u16,
    pub error: String,
    pub error_code: String,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldViolation>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    field_errors: Vec<FieldViolation>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_REQUEST, message)
    }

    pub fn route_not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ROUTE_NOT_FOUND,
            format!("no route for {path}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!("event=request_failed module=api status=error code={INTERNAL_ERROR} error={message}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR,
            "internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            timestamp: 0,
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            error_code: self.code.to_string(),
            message: self.message.clone(),
            path: String::new(),
            field_errors: self.field_errors.clone(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        let mut response = (self.status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        match err {
            ServiceError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, code, err.to_string()),
            ServiceError::DuplicateEmail(_) | ServiceError::DuplicateIsbn(_) => {
                Self::new(StatusCode::CONFLICT, code, err.to_string())
            }
            ServiceError::Validation(ref validation) => {
                let mut api = Self::new(StatusCode::BAD_REQUEST, code, "validation failed");
                api.field_errors = validation.violations().to_vec();
                api
            }
            ServiceError::InvalidState { .. } | ServiceError::MembershipUpgrade(_) => {
                warn!("event=request_rejected module=api status=error code={code} error={err}");
                Self::new(StatusCode::BAD_REQUEST, code, err.to_string())
            }
            ServiceError::Repo(RepoError::AmountOverflow(_)) => {
                error!("event=request_failed module=api status=error code={code} error={err}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
            }
            ServiceError::Repo(repo) => Self::internal(repo.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use bookstore_core::{RepoError, ServiceError, ValidationError};

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::not_found("Book", 1), StatusCode::NOT_FOUND),
            (
                ServiceError::DuplicateEmail("a@b.co".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::DuplicateIsbn("9780000000001".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::invalid_state("BOOK_NOT_AVAILABLE", "on loan"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::MembershipUpgrade("nope".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Repo(RepoError::AmountOverflow("total revenue")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn validation_keeps_field_errors() {
        let err = ServiceError::Validation(ValidationError::single(
            "title",
            Some(""),
            "must not be blank",
        ));
        let body = ApiError::from(err).body();
        assert_eq!(body.status, 400);
        assert_eq!(body.error_code, "VALIDATION_FAILED");
        assert_eq!(body.field_errors.len(), 1);
        assert_eq!(body.field_errors[0].field, "title");
    }

    #[test]
    fn internal_errors_hide_details() {
        let body = ApiError::internal("disk I/O error").body();
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "internal server error");
        assert_eq!(body.error, "Internal Server Error");
    }
}
