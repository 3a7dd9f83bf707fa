use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::{error, warn};

use super::models::ErrorResponse;
use super::validation::RequestValidationError;
use crate::manager::ManagerError;
use crate::tasks::StoreError;
use crate::urls::UrlError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) | ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "INVALID_STATE",
            ApiError::Upstream(_) => "EXTRACTION_FAILED",
            ApiError::Unavailable(_) => "UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        } else {
            warn!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            code: self.code(),
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(value: RequestValidationError) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<ManagerError> for ApiError {
    fn from(value: ManagerError) -> Self {
        match value {
            ManagerError::InvalidUrl(UrlError::Invalid(detail)) => ApiError::InvalidUrl(detail),
            ManagerError::Store(StoreError::NotFound(id)) => ApiError::NotFound(format!("task {id}")),
            ManagerError::Store(e @ StoreError::InvalidTransition { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            e @ ManagerError::NotReady { .. } => ApiError::Conflict(e.to_string()),
            e @ ManagerError::FileMissing(_) => ApiError::NotFound(e.to_string()),
            ManagerError::Handler(e) => ApiError::Upstream(e.to_string()),
            ManagerError::Pool(e) => ApiError::Unavailable(e.to_string()),
            ManagerError::Registry(e) => ApiError::Internal(e.to_string()),
        }
    }
}
