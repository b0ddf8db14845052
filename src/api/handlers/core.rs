use crate::api::types::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.to_string_lossy(),
        "pdfRenderer": state.pdf.as_ref().map(|p| p.base_url().to_string()),
    }))
}
