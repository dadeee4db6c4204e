use axum::http::StatusCode;
use serde_json::json;

use crate::db::models::cancellation::CancellationStatus;
use crate::db::models::submission::SubmissionStatus;
use crate::utils::api_response::ApiResponse;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Why an otherwise well-formed operation is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidState {
    #[error("submission is {0:?} and can no longer be cancelled")]
    SubmissionNotCancellable(SubmissionStatus),

    #[error("a cancellation request is already pending for this submission")]
    AlreadyRequested,

    #[error("cancellation request was already {}", .0.as_str())]
    AlreadyDecided(CancellationStatus),
}

impl InvalidState {
    /// Stable code clients branch on.
    pub fn code(&self) -> &'static str {
        match self {
            InvalidState::SubmissionNotCancellable(_) => "submission_not_cancellable",
            InvalidState::AlreadyRequested => "cancellation_already_requested",
            InvalidState::AlreadyDecided(_) => "already_decided",
        }
    }
}

/// Errors surfaced by the services and the store behind them.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    InvalidState(#[from] InvalidState),

    #[error("{0} not found")]
    NotFound(String),

    #[error("dependency failure: {0}")]
    DependencyFailure(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::DependencyFailure(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiResponse<()> {
    fn from(err: ServiceError) -> Self {
        let status = err.status_code();
        match &err {
            ServiceError::Validation { field, message } => ApiResponse::error(
                status,
                "Invalid request",
                Some(json!({ "code": "validation", "field": field, "message": message })),
            ),
            ServiceError::InvalidState(state) => ApiResponse::error(
                status,
                err.to_string(),
                Some(json!({ "code": state.code() })),
            ),
            ServiceError::NotFound(_) => {
                ApiResponse::error(status, err.to_string(), Some(json!({ "code": "not_found" })))
            }
            ServiceError::DependencyFailure(detail) => {
                tracing::error!(%detail, "cancellation dependency failed");
                ApiResponse::error(
                    status,
                    "Could not complete the operation, nothing was changed",
                    Some(json!({ "code": "dependency_failure" })),
                )
            }
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ApiResponse::error(
                    status,
                    "Database operation failed",
                    Some(json!({ "code": "database" })),
                )
            }
        }
    }
}
