//! checkhook entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: command-line flags via `clap`, then the layered
//!    `figment` configuration (defaults, `checkhook.toml`, `CHECKHOOK_*`).
//! 2. **Wire observability**: install the `tracing-subscriber` stack and, when
//!    configured, the OpenTelemetry OTLP exporter. All `tracing` spans and
//!    events emitted by every crate in the workspace flow through it.
//! 3. **Construct infrastructure**: the in-memory store seeded from the
//!    catalog, the templated credential resolver, the HTTP scanner, and the
//!    tracing event sink, all injected into [`pipeline::WebhookService`].
//! 4. **Serve** the webhook routes until Ctrl-C.

mod config;
mod telemetry;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use listener::{webhook_router, ListenerState};
use pipeline::{Collaborators, TemplatedCredentials, TracingEventSink, WebhookService};
use scanner::HttpScanner;
use store::{MemoryStore, StaticVariables};
use tokio::net::TcpListener;

use crate::config::CheckhookConfig;

/// Receives check webhooks and asks the scanning service to check the
/// matching resources immediately.
#[derive(Debug, Parser)]
#[command(name = "checkhook", version, about)]
struct Cli {
    /// Configuration file. Defaults to `checkhook.toml` when present.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides `server.bind_addr`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Validates the configuration and exits.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config =
        CheckhookConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _telemetry = telemetry::init(&config.telemetry).context("failed to initialise telemetry")?;

    let state = build_state(&config)?;
    if cli.check_config {
        tracing::info!(
            pipelines = config.catalog.pipelines.len(),
            "configuration is valid"
        );
        return Ok(());
    }

    let bind_addr = match cli.bind {
        Some(addr) => addr,
        None => config.bind_addr()?,
    };
    let tcp = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    listener::serve(tcp, webhook_router(state), shutdown_signal())
        .await
        .context("webhook listener failed")?;

    tracing::info!("webhook listener stopped");
    Ok(())
}

fn build_state(config: &CheckhookConfig) -> anyhow::Result<ListenerState> {
    let store =
        Arc::new(MemoryStore::from_catalog(&config.catalog).context("invalid catalog")?);
    let credentials = TemplatedCredentials::new(StaticVariables::new(config.variables.clone()));
    let scanner = HttpScanner::new(config.scanner.base_url.clone(), config.scanner.timeout())
        .context("failed to create scanner client")?;

    let service = WebhookService::new(Collaborators {
        pipelines: store.clone(),
        resources: store.clone(),
        configs: store,
        credentials: Arc::new(credentials),
        scanner: Arc::new(scanner),
        events: Arc::new(TracingEventSink),
    });

    Ok(ListenerState::new(service, config.default_team()?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
