use reqwest::multipart::{Form, Part};

/// Chromium HTML route of a Gotenberg-compatible print service.
const CONVERT_PATH: &str = "/forms/chromium/convert/html";

// A4, inches.
const PAPER_WIDTH: &str = "8.27";
const PAPER_HEIGHT: &str = "11.7";
// 20px at 96dpi.
const MARGIN: &str = "0.21";

/// Exported fragments are styled with utility classes, so the document pulls
/// in the Tailwind play CDN; the renderer waits for network idle before
/// printing.
pub const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("pdf renderer not configured")]
    NotConfigured,
    #[error("pdf renderer request failed: {0}")]
    Transport(String),
}

/// Builds the standalone document the print service loads.
pub fn wrap_document(html: &str, css: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
{css}
@media print {{
  body {{ -webkit-print-color-adjust: exact; }}
}}
</style>
<script src="{TAILWIND_CDN}"></script>
</head>
<body>
{html}
</body>
</html>
"#
    )
}

#[derive(Debug, Clone)]
pub struct PdfRenderer {
    client: reqwest::Client,
    base_url: String,
}

impl PdfRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        PdfRenderer {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One synchronous round trip: no retry, no streaming.
    pub async fn render(&self, html: &str, css: &str) -> Result<Vec<u8>, PdfError> {
        let document = wrap_document(html, css);
        let index = Part::bytes(document.into_bytes())
            .file_name("index.html")
            .mime_str("text/html")
            .map_err(|e| PdfError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("files", index)
            .text("paperWidth", PAPER_WIDTH)
            .text("paperHeight", PAPER_HEIGHT)
            .text("marginTop", MARGIN)
            .text("marginBottom", MARGIN)
            .text("marginLeft", MARGIN)
            .text("marginRight", MARGIN)
            .text("printBackground", "true")
            .text("skipNetworkIdleEvent", "false");

        let url = format!("{}{}", self.base_url, CONVERT_PATH);
        tracing::debug!(%url, "sending document to pdf renderer");
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PdfError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, "pdf renderer rejected document");
            return Err(PdfError::Transport(format!(
                "renderer returned {}: {}",
                status,
                body.trim()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PdfError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
