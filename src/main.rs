use std::time::Duration;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use issuedesk::server::{self, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("ISSUEDESK_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7880);
    let session_ttl_secs: u64 = std::env::var("ISSUEDESK_SESSION_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600);
    let provision_key = std::env::var("ISSUEDESK_PROVISION_KEY").ok().filter(|s| !s.is_empty());
    info!(
        target: "issuedesk",
        "issuedesk starting: RUST_LOG='{}', http_port={}, session_ttl_secs={}, provisioning={}",
        rust_log,
        http_port,
        session_ttl_secs,
        if provision_key.is_some() { "enabled" } else { "disabled" }
    );

    server::run_with_config(ServerConfig {
        http_port,
        session_ttl: Duration::from_secs(session_ttl_secs),
        provision_key,
    })
    .await
}
