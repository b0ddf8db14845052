use super::handlers::{core, export, store, students, tables};
use super::types::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Rosters and rendered HTML can be large.
pub const BODY_LIMIT: usize = 50 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(core::health))
        .route("/students/upload", post(students::upload))
        .route("/students/save", post(students::save))
        .route("/students/list/courses", get(students::list_courses))
        .route(
            "/students/:course_id",
            get(students::retrieve).delete(students::delete),
        )
        .route("/students/:course_id/roles", get(students::roles))
        .route("/export/pdf", post(export::pdf))
        .route("/tables", get(tables::list))
        .route("/tables/save", post(tables::save))
        .route("/tables/:id", get(tables::get))
        .route("/store", get(store::snapshot))
        .route("/store/dispatch", post(store::dispatch));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
