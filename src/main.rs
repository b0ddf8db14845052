use clap::Parser;
use coursebook::api;
use coursebook::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    setup_logging(&config.log_level);
    api::run(&config).await
}

// Logs go to stderr; stdout only carries the "listening on" line.
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
