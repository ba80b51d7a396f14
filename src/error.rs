// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::grading::GradingError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., finalizing an attempt with ungraded questions)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => msg,
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Rule violations on input are 400; violations of the attempt's state are 409.
impl From<GradingError> for AppError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::ScoreMissing
            | GradingError::ScoreOutOfRange { .. }
            | GradingError::NotFreeResponse { .. }
            | GradingError::UnknownQuestion { .. } => AppError::BadRequest(err.to_string()),
            GradingError::AttemptFinalized { .. }
            | GradingError::NotSubmitted { .. }
            | GradingError::GradingIncomplete { .. }
            | GradingError::AlreadySubmitted { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grading_error_status_mapping() {
        let bad: AppError = GradingError::ScoreOutOfRange { score: 7.0, max: 5.0 }.into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let conflict: AppError = GradingError::GradingIncomplete { remaining: 2 }.into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(matches!(conflict, AppError::Conflict(msg) if msg.contains("2 free-response")));

        let unsubmitted: AppError = GradingError::NotSubmitted { attempt_id: 4 }.into();
        assert_eq!(unsubmitted.status(), StatusCode::CONFLICT);
    }
}
