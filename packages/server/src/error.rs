use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::{ContentHash, StorageError};
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Failures surfaced by the dedup core.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Required input was missing or rejected before any content was stored.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The upload's byte source failed mid-stream.
    #[error("failed to read upload: {0}")]
    IoRead(#[source] std::io::Error),

    /// Persisting blob bytes failed.
    #[error("failed to store blob: {0}")]
    StorageWrite(#[source] StorageError),

    /// An insert race could not be resolved by falling back to an increment.
    #[error("conflicting concurrent upload for digest {0}")]
    Conflict(ContentHash),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Read(e) => IngestError::IoRead(e),
            StorageError::NotFound(handle) => IngestError::NotFound(format!("blob {handle}")),
            StorageError::SizeLimitExceeded { .. } => IngestError::Validation(err.to_string()),
            other => IngestError::StorageWrite(other),
        }
    }
}

impl From<RepositoryError> for IngestError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(hash) => IngestError::NotFound(format!("record {hash}")),
            other => IngestError::Repository(other),
        }
    }
}

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Missing 'file' field")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An error occurred while processing the file".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(err.to_string())
    }
}
