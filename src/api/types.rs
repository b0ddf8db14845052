use super::error::ApiError;
use crate::config::Config;
use crate::db;
use crate::pdf::PdfRenderer;
use crate::store::{CourseStore, SqliteSnapshots};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

pub struct AppState {
    pub workspace: PathBuf,
    pub db: Mutex<Connection>,
    pub store: Mutex<CourseStore<SqliteSnapshots>>,
    pub pdf: Option<PdfRenderer>,
}

impl AppState {
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let conn = db::open_db(&config.workspace)?;
        let store = CourseStore::open(SqliteSnapshots::open(&config.workspace)?)?;
        Ok(AppState {
            workspace: config.workspace.clone(),
            db: Mutex::new(conn),
            store: Mutex::new(store),
            pdf: config.pdf_service_url.as_deref().map(PdfRenderer::new),
        })
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Db(anyhow::anyhow!("database lock poisoned")))
    }

    pub fn store(&self) -> Result<MutexGuard<'_, CourseStore<SqliteSnapshots>>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::Db(anyhow::anyhow!("store lock poisoned")))
    }
}

/// Unwraps a JSON body, reporting malformed input as `bad_params`.
pub fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(v)) => Ok(v),
        Err(e) => Err(ApiError::bad_params(e.body_text())),
    }
}

pub fn param_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Reads `key` as an array of row objects.
pub fn param_rows(params: &Value, key: &str) -> Result<Option<Vec<Map<String, Value>>>, ApiError> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(items) = v.as_array() else {
        return Err(ApiError::bad_params(format!("{} must be an array", key)));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(m) => Ok(m.clone()),
            _ => Err(ApiError::bad_params(format!(
                "{}[{}] must be an object",
                key, i
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn param_strings(params: &Value, key: &str) -> Result<Option<Vec<String>>, ApiError> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(items) = v.as_array() else {
        return Err(ApiError::bad_params(format!("{} must be an array", key)));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ApiError::bad_params(format!("{} must contain only strings", key)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
