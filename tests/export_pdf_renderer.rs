use axum::body::{to_bytes, Body};
use axum::extract::Multipart;
use axum::http::{header, Method, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use coursebook::api::{router, AppState};
use coursebook::config::Config;
use coursebook::pdf::wrap_document;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

const FAKE_PDF: &[u8] = b"%PDF-1.7 fake";

// Echoes a fixed PDF when the form looks like a chromium html conversion.
async fn fake_convert(mut multipart: Multipart) -> (StatusCode, Vec<u8>) {
    let mut index_html = None;
    let mut paper_width = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let text = field.text().await.unwrap_or_default();
        match name.as_deref() {
            Some("files") if file_name.as_deref() == Some("index.html") => index_html = Some(text),
            Some("paperWidth") => paper_width = Some(text),
            _ => {}
        }
    }
    match (index_html, paper_width) {
        (Some(html), Some(w)) if html.contains("<table>") && w == "8.27" => {
            (StatusCode::OK, FAKE_PDF.to_vec())
        }
        _ => (StatusCode::BAD_REQUEST, b"bad form".to_vec()),
    }
}

async fn spawn_renderer(status_override: Option<StatusCode>) -> SocketAddr {
    let app = match status_override {
        None => Router::new().route("/forms/chromium/convert/html", post(fake_convert)),
        Some(code) => Router::new().route(
            "/forms/chromium/convert/html",
            post(move || async move { (code, "renderer down") }),
        ),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake renderer");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn app_with_renderer(prefix: &str, url: Option<String>) -> Router {
    let mut config = Config::for_workspace(temp_dir(prefix));
    config.pdf_service_url = url;
    router(Arc::new(AppState::open(&config).expect("open app state")))
}

fn export_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/export/pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn export_returns_renderer_bytes() {
    let addr = spawn_renderer(None).await;
    let app = app_with_renderer("coursebook-pdf-ok", Some(format!("http://{}/", addr)));

    let resp = app
        .oneshot(export_request(json!({
            "html": "<table><tr><td>CO1</td></tr></table>",
            "css": "td { color: red; }"
        })))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(&b"application/pdf"[..])
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&bytes[..], FAKE_PDF);
}

#[tokio::test]
async fn export_without_renderer_is_unavailable() {
    let app = app_with_renderer("coursebook-pdf-none", None);
    let resp = app
        .oneshot(export_request(json!({ "html": "<p>x</p>" })))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value =
        serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.expect("body"))
            .expect("json");
    assert_eq!(body["error"]["code"], json!("transport_failed"));
}

#[tokio::test]
async fn export_requires_html() {
    let app = app_with_renderer("coursebook-pdf-nohtml", None);
    let resp = app
        .oneshot(export_request(json!({ "css": "p {}" })))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn renderer_failure_is_bad_gateway() {
    let addr = spawn_renderer(Some(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let app = app_with_renderer("coursebook-pdf-fail", Some(format!("http://{}", addr)));
    let resp = app
        .oneshot(export_request(json!({ "html": "<table></table>" })))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value =
        serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.expect("body"))
            .expect("json");
    assert_eq!(body["error"]["code"], json!("transport_failed"));
    assert!(body["error"]["message"]
        .as_str()
        .expect("message")
        .contains("renderer down"));
}

#[test]
fn wrapped_document_keeps_css_and_forces_print_colors() {
    let doc = wrap_document("<p>hi</p>", ".x { color: blue; }");
    assert!(doc.starts_with("<!DOCTYPE html>"));
    assert!(doc.contains(".x { color: blue; }"));
    assert!(doc.contains("-webkit-print-color-adjust: exact"));
    assert!(doc.contains("<body>\n<p>hi</p>\n</body>"));
    let head = doc.split("</head>").next().expect("head");
    assert!(head.contains(r#"<script src="https://cdn.tailwindcss.com"></script>"#));
}
