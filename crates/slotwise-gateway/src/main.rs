use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use slotwise_core::config::SlotwiseConfig;
use slotwise_sync::{build_channel, SyncGateway};
use tracing::{info, warn};

mod app;
mod http;
mod service;

/// How long shutdown waits for the last snapshot to reach the channel.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "slotwise-gateway", version, about = "Recurring schedule service")]
struct Cli {
    /// Config file (default: $SLOTWISE_CONFIG, then ~/.slotwise/slotwise.toml)
    #[arg(long, short)]
    config: Option<String>,

    /// Override [gateway] bind
    #[arg(long)]
    bind: Option<String>,

    /// Override [gateway] port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "slotwise_gateway=info,slotwise_sync=info,slotwise_scheduler=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // explicit path > SLOTWISE_CONFIG env > ~/.slotwise/slotwise.toml
    let config_path = cli.config.or_else(|| std::env::var("SLOTWISE_CONFIG").ok());
    let mut config = SlotwiseConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        SlotwiseConfig::default()
    });
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let channel = build_channel(&config.channel)?;
    let (sync, worker) = SyncGateway::start(channel, &config.sync);
    let store = sync.load().await;
    info!(schedules = store.len(), "store ready");

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(
        config,
        service::ScheduleService::new(store, sync),
    ));
    let router = app::build_router(state);

    info!("Slotwise gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last handle to the pusher; the worker now flushes
    // any unsaved snapshot and exits.
    match tokio::time::timeout(FLUSH_TIMEOUT, worker).await {
        Ok(_) => info!("push worker drained"),
        Err(_) => warn!(timeout_secs = FLUSH_TIMEOUT.as_secs(), "push worker still busy at exit"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
