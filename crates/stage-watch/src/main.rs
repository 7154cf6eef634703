//! stage-watch service binary.
//!
//! Listens for stage-status events from the build server and posts chat
//! alerts when a pipeline stage starts failing or recovers.
//!
//! # Environment Variables
//!
//! - `STAGE_WATCH_PORT` - HTTP listen port (default 8090)
//! - `NOTIFY_API_URL` - chat webhook endpoint
//! - `NOTIFY_API_USER` - sender identity shown in messages
//! - `GO_SERVER_URL` - build server base URL for run links
//! - `NOTIFY_TIMEOUT_SECS` - webhook timeout (default 5)
//! - `RUST_LOG` - log filter (default `stage_watch=info,notify=info`)
//!
//! Command-line flags override the environment.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use notify::Notifier;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stage_watch::server::{self, AppState};
use stage_watch::{Config, FailureRegistry, StageStatusHandler};

/// Post chat alerts when pipeline stages fail or recover.
#[derive(Parser)]
#[command(name = "stage-watch")]
#[command(about = "Post chat alerts when pipeline stages fail or recover")]
#[command(version)]
struct Cli {
    /// HTTP listen port (overrides `STAGE_WATCH_PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Chat webhook endpoint (overrides `NOTIFY_API_URL`)
    #[arg(long)]
    api_url: Option<String>,

    /// Sender identity (overrides `NOTIFY_API_USER`)
    #[arg(long)]
    api_user: Option<String>,

    /// Build server base URL (overrides `GO_SERVER_URL`)
    #[arg(long)]
    go_server_url: Option<String>,

    /// Webhook timeout in seconds (overrides `NOTIFY_TIMEOUT_SECS`)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, env = "STAGE_WATCH_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "stage_watch=info,notify=info";

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    info!("Starting stage-watch service...");

    // Load configuration
    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.api_url.is_some() {
        config.notify.api_url = cli.api_url;
    }
    if cli.api_user.is_some() {
        config.notify.api_user = cli.api_user;
    }
    if cli.go_server_url.is_some() {
        config.notify.go_server_url = cli.go_server_url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.notify.timeout = Duration::from_secs(secs);
    }

    if config.notify.is_complete() {
        info!(
            api_user = ?config.notify.api_user,
            go_server_url = ?config.notify.go_server_url,
            "Chat notifications enabled"
        );
    } else {
        for problem in config.notify.validate() {
            warn!(key = problem.key, "{}", problem.message);
        }
        warn!("Chat notifications disabled until settings are complete");
    }

    let notifier =
        Notifier::new(config.notify.timeout).context("Failed to build webhook HTTP client")?;
    let handler = StageStatusHandler::new(Arc::new(FailureRegistry::new()), notifier);

    let state = AppState {
        handler: Arc::new(handler),
        settings: Arc::new(config.notify.clone()),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    server::run_server(state, addr)
        .await
        .context("Server error")?;

    Ok(())
}
