use crate::api::error::ApiError;
use crate::api::types::{json_body, AppState};
use crate::store::Action;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let store = state.store()?;
    Ok(Json(json!(store.state())))
}

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = json_body(body)?;
    let action: Action = serde_json::from_value(params)
        .map_err(|e| ApiError::bad_params(format!("invalid action: {}", e)))?;

    let mut store = state.store()?;
    let next = store.dispatch(action)?;
    Ok(Json(json!(next)))
}
