use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use super::models::ErrorResponse;
use crate::orchestrator::TaskError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("{0}")]
    TooManyLinks(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Busy(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyLinks(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::TooManyLinks(_) => "TOO_MANY_LINKS",
            ApiError::NotFound(_) => "TASK_NOT_FOUND",
            ApiError::Busy(_) => "SERVER_BUSY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<TaskError> for ApiError {
    fn from(value: TaskError) -> Self {
        match value {
            TaskError::ServerBusy => ApiError::Busy(value.to_string()),
            TaskError::TaskNotFound(_) => ApiError::NotFound(value.to_string()),
            TaskError::TooManyLinks => ApiError::TooManyLinks(value.to_string()),
        }
    }
}
