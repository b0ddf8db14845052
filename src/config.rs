use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Course roster and marks service")]
pub struct Config {
    /// Directory holding coursebook.sqlite3; created if missing.
    #[arg(long, env = "COURSEBOOK_WORKSPACE", default_value = "workspace")]
    pub workspace: PathBuf,

    #[arg(long, env = "COURSEBOOK_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Base URL of a Gotenberg-compatible print service. PDF export is
    /// disabled when unset.
    #[arg(long, env = "PDF_SERVICE_URL")]
    pub pdf_service_url: Option<String>,

    #[arg(short, long, env = "COURSEBOOK_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        Config {
            workspace: workspace.into(),
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            pdf_service_url: None,
            log_level: "info".to_string(),
        }
    }
}
