use crate::api::error::ApiError;
use crate::api::types::{json_body, param_str, AppState};
use crate::pdf::PdfError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

pub async fn pdf(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let params = json_body(body)?;
    let html = param_str(&params, "html")
        .ok_or_else(|| ApiError::bad_params("missing html"))?;
    let css = param_str(&params, "css").unwrap_or("");

    let renderer = state.pdf.as_ref().ok_or(PdfError::NotConfigured)?;
    let bytes = renderer.render(html, css).await?;
    tracing::debug!(bytes = bytes.len(), "pdf rendered");

    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}
