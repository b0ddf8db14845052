mod error;
mod handlers;
mod router;
mod types;

pub use error::{err_body, ApiError};
pub use router::{router, BODY_LIMIT};
pub use types::AppState;

use crate::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Opens the workspace, binds and serves until the process is stopped.
///
/// The bound address is printed to stdout as `listening on http://<addr>`
/// so callers binding port 0 can find the real port.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::open(config)?);
    let app = router(state);

    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, workspace = %config.workspace.to_string_lossy(), "server started");
    println!("listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
