//! # quadro-backend
//!
//! Quadro realtime backend binary. Wires the token service, membership
//! store, project directory and event registry together and starts the
//! HTTP/WebSocket gateway.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quadro_projects::{InMemoryMembershipStore, MembershipService, ProjectDirectory};
use quadro_server::config::{QuadroConfig, load_config_from_path};
use quadro_server::functionality::handlers::register_all;
use quadro_server::functionality::registry::EventRegistry;
use quadro_server::metrics;
use quadro_server::server::RealtimeServer;
use quadro_session::TokenService;

/// Quadro realtime server.
#[derive(Parser, Debug)]
#[command(name = "quadro-backend", about = "Quadro realtime server")]
struct Cli {
    /// Host to bind (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the JSON config file.
    #[arg(long, default_value = "quadro.json")]
    config: PathBuf,

    /// HMAC secret for token signing (overrides the config file).
    #[arg(long)]
    token_secret: Option<String>,

    /// Minimum log level when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Fold CLI overrides into a loaded configuration.
    fn apply_to(&self, config: &mut QuadroConfig) {
        if let Some(ref host) = self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref secret) = self.token_secret {
            config.auth.token_secret.clone_from(secret);
        }
    }
}

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over the `--log-level` flag. Subsequent calls
/// are no-ops.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Config before logging so the log level flag wins over nothing.
    let mut config = load_config_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.apply_to(&mut config);

    init_logging(&args.log_level);
    let metrics_handle = metrics::install_recorder();

    // Core services
    let tokens = Arc::new(TokenService::new(config.auth.token_secret.as_bytes()));
    let membership = Arc::new(MembershipService::new(Arc::new(
        InMemoryMembershipStore::new(),
    )));
    let directory = Arc::new(ProjectDirectory::new(tokens, membership));

    let mut registry = EventRegistry::new();
    register_all(&mut registry);
    tracing::debug!(
        event_count = registry.event_names().len(),
        events = ?registry.event_names(),
        "event registry created"
    );

    let server = RealtimeServer::new(
        config.server.clone(),
        registry,
        directory,
        metrics_handle,
    );

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!(
        "quadro backend listening on http://{addr} ({} events registered)",
        server.registry().event_names().len()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["quadro-backend"]);
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert_eq!(cli.config, PathBuf::from("quadro.json"));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn cli_custom_host_and_port() {
        let cli = Cli::parse_from(["quadro-backend", "--host", "0.0.0.0", "--port", "8080"]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(8080));
    }

    #[test]
    fn cli_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "quadro-backend",
            "--host",
            "10.0.0.1",
            "--port",
            "4000",
            "--token-secret",
            "override",
        ]);
        let mut config = QuadroConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.token_secret, "override");
    }

    #[test]
    fn cli_without_overrides_leaves_config_alone() {
        let cli = Cli::parse_from(["quadro-backend"]);
        let mut config = QuadroConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.auth.token_secret, "quadro-dev-secret");
    }
}
