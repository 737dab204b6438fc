//! JSON error responses for the web adapter.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::JournalError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub field: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Logs `detail` and hides it from the caller.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

pub fn status_from_error(err: &JournalError) -> StatusCode {
    match err {
        JournalError::Validation { .. } | JournalError::Import { .. } => StatusCode::BAD_REQUEST,
        JournalError::Authentication { .. } => StatusCode::UNAUTHORIZED,
        JournalError::NotFound { .. } => StatusCode::NOT_FOUND,
        JournalError::Conflict { .. } => StatusCode::CONFLICT,
        JournalError::Database { .. }
        | JournalError::DatabaseQuery { .. }
        | JournalError::ConfigParse { .. }
        | JournalError::ConfigMissing { .. }
        | JournalError::ConfigInvalid { .. }
        | JournalError::PasswordHash { .. }
        | JournalError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JournalError> for WebError {
    fn from(err: JournalError) -> Self {
        if !err.is_client_error() {
            return Self::internal(&err);
        }
        Self {
            status: status_from_error(&err),
            message: err.to_string(),
            field: err.field().map(str::to_string),
        }
    }
}

impl From<axum_login::Error<super::Backend>> for WebError {
    fn from(err: axum_login::Error<super::Backend>) -> Self {
        match err {
            axum_login::Error::Backend(inner) => inner.into(),
            axum_login::Error::Session(inner) => Self::internal(inner),
        }
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            field: self.field.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
