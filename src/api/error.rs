use crate::ingest::IngestError;
use crate::pdf::PdfError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0:#}")]
    Db(anyhow::Error),
}

impl ApiError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "bad_params",
            ApiError::Parse(_) => "parse_failed",
            ApiError::NotFound(_) => "not_found",
            ApiError::Transport(_) | ApiError::Unavailable(_) => "transport_failed",
            ApiError::Db(_) => "db_query_failed",
        }
    }
}

pub fn err_body(code: &str, message: impl Into<String>) -> serde_json::Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message.into(),
        }
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(code = self.code(), %message, "request failed");
        } else {
            tracing::warn!(code = self.code(), %message, "request rejected");
        }
        (status, Json(err_body(self.code(), message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Db(e)
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Parse(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(..) => ApiError::NotFound(e.to_string()),
            StoreError::Persist(inner) => ApiError::Db(inner),
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::NotConfigured => ApiError::Unavailable(e.to_string()),
            PdfError::Transport(_) => ApiError::Transport(e.to_string()),
        }
    }
}
