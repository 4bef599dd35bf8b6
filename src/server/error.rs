use crate::export::ExportError;
use crate::store::StoreError;
use crate::tree::TreeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Everything a handler can fail with, mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    Tree(TreeError),
    Export(ExportError),
    Store(StoreError),
    BadRequest(String),
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Tree(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Tree(TreeError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            ApiError::Tree(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Export(ExportError::PageNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Tree(e) => json!({ "error": e.to_string() }),
            ApiError::Export(e) => {
                let message = e.to_string();
                let ExportError::PageNotFound { available, .. } = e;
                json!({ "error": message, "availablePages": available })
            }
            ApiError::Store(e) => {
                error!("Store request failed: {}", e);
                json!({ "error": "Failed to reach the document store", "message": e.to_string() })
            }
            ApiError::BadRequest(message) => json!({ "error": message }),
            ApiError::Unauthorized => json!({ "error": "Missing or invalid API key" }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        Self::Export(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON body: {err}"))
    }
}
