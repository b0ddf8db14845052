use crate::api::error::ApiError;
use crate::api::types::{json_body, param_rows, param_str, param_strings, AppState};
use crate::db;
use crate::ingest;
use crate::roles;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

const UPLOAD_FIELD: &str = "file";

pub async fn upload(mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_params(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_params(e.body_text()))?;
        file = Some(bytes.to_vec());
    }

    let Some(bytes) = file.filter(|b| !b.is_empty()) else {
        return Err(ApiError::bad_params("No file uploaded"));
    };

    let roster = ingest::read_workbook(&bytes)?;
    Ok(Json(json!({
        "headers": roster.headers,
        "rows": roster.rows,
    })))
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let params = json_body(body)?;

    let course_id = param_str(&params, "courseId")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_params("Missing courseId or students data"))?
        .to_string();
    let Some(rows) = param_rows(&params, "students")? else {
        return Err(ApiError::bad_params("Missing courseId or students data"));
    };
    let headers = param_strings(&params, "headers")?;
    let problem = match headers.as_deref() {
        Some(h) => db::header_problem(h),
        None => db::header_problem(&db::headers_from_rows(&rows)),
    };
    if let Some(problem) = problem {
        return Err(ApiError::bad_params(problem));
    }
    let course_info = params.get("courseInfo").filter(|v| !v.is_null());

    let conn = state.db()?;
    let summary = db::save_roster(&conn, &course_id, &rows, headers.as_deref(), course_info)?;
    tracing::info!(
        course_id = %course_id,
        rows = summary.rows_written,
        replaced = summary.rows_replaced,
        "roster saved"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Data saved successfully",
    })))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    let (headers, rows, metadata) = db::load_roster(&conn, &course_id)?.into_parts();

    let mut out = json!({
        "students": rows,
        "headers": headers,
    });
    if let Some(meta) = metadata {
        out["courseInfo"] = meta;
    }
    Ok(Json(out))
}

/// Roll number / name per stored row, for table views.
pub async fn roles(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    let (headers, rows, _) = db::load_roster(&conn, &course_id)?.into_parts();
    let info: Vec<roles::DisplayInfo> = rows
        .into_iter()
        .map(|row| roles::infer_roles_with_headers(&Value::Object(row), &headers))
        .collect();
    Ok(Json(json!(info)))
}

pub async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    let courses: Vec<Value> = db::list_courses(&conn)?
        .into_iter()
        .map(|id| json!({ "courseId": id }))
        .collect();
    Ok(Json(Value::Array(courses)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.db()?;
    let removed = db::delete_course(&conn, &course_id)?;
    tracing::info!(course_id = %course_id, rows = removed, "course deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Course deleted successfully",
    })))
}
