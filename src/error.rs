use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("This time slot is no longer available")]
    SlotConflict,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Reservation write failed: {0}")]
    WriteFailure(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref err) => match err {
                DatabaseError::Duplicate => (StatusCode::CONFLICT, "Resource already exists"),
                DatabaseError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input data"),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            AppError::SlotConflict => (
                StatusCode::CONFLICT,
                "This time slot is no longer available, please pick another time",
            ),
            AppError::UpstreamUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
            }
            AppError::WriteFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The reservation could not be saved",
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
