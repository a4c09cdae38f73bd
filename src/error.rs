use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::storage::StorageError;

/// Field-level errors from the upload form. Only the fields that failed are
/// present in the rendered JSON.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct UploadErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UploadErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.image.is_none()
    }
}

/// The submitted text fields, echoed back so the form can re-display them.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UploadValues {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything a workflow can fail with. Nothing else crosses the HTTP
/// boundary: handlers return `Result<_, ApiError>` and this type renders the
/// response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation {
        errors: UploadErrors,
        values: UploadValues,
    },
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { errors, values } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "errors": errors, "values": values })),
            )
                .into_response(),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            // Details from the external services stay in the log.
            ApiError::Database(e) => {
                tracing::error!("database error: {e}");
                internal_error()
            }
            ApiError::Storage(e) => {
                tracing::error!("storage error: {e}");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}
