use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{store::StoreError, validation::ValidationErrors};

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Poll not found")]
    NotFound,

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PollNotFound => AppError::NotFound,
            StoreError::OptionNotInPoll { .. } => {
                AppError::Validation(ValidationErrors::single("poll_option_id", err.to_string()))
            }
            other => AppError::Persistence(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "message": "Not Found" })),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "The given data was invalid", "errors": errors }),
            ),
            AppError::Persistence(err) => {
                tracing::error!("Persistence error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": UNEXPECTED_ERROR }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
