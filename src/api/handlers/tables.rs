use crate::api::error::ApiError;
use crate::api::types::{json_body, param_str, AppState};
use crate::db;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

fn param_id(params: &Value) -> Result<Option<i64>, ApiError> {
    match params.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::bad_params("id must be an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::bad_params("id must be an integer")),
        Some(_) => Err(ApiError::bad_params("id must be an integer")),
    }
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = json_body(body)?;
    let id = param_id(&params)?;
    let name = param_str(&params, "name");
    let data = params
        .get("data")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::bad_params("missing data"))?;

    let conn = state.db()?;
    let table = db::save_table(&conn, id, name, data)?;
    Ok(Json(json!(table)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    match db::get_table(&conn, id)? {
        Some(table) => Ok(Json(json!(table))),
        None => Err(ApiError::NotFound("Table not found".into())),
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    Ok(Json(json!(db::list_tables(&conn)?)))
}
