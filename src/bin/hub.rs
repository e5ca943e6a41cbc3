use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use network_monitoring::{
    actors::MonitorHandle,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::read_config_file,
    lifecycle::LifecycleManager,
    monitors::CheckerRegistry,
    storage::open_store,
    util,
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Run the monitor without serving the alert API
    #[arg(long)]
    no_api: bool,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("network_monitoring", LevelFilter::TRACE),
        ("netmon_hub", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let store = open_store(&config.storage.clone().unwrap_or_default()).await?;
    let lifecycle = Arc::new(LifecycleManager::new(
        store.clone(),
        config.scheduler.problem_expiration(),
    ));

    let checkers = CheckerRegistry::standard(config.scheduler.probe_timeout())?;
    let monitor = MonitorHandle::spawn(&config, lifecycle.clone(), checkers);

    if !args.no_api {
        let api_config = ApiConfig {
            bind_addr: SocketAddr::new(util::get_addr(), util::get_port()),
            auth_token: util::get_token(),
            enable_cors: true,
        };
        if api_config.auth_token.is_none() {
            info!("NETMON_TOKEN not set, alert API is unauthenticated");
        }

        let state = ApiState::new(lifecycle.clone(), Some(monitor.clone()));
        spawn_api_server(api_config, state).await?;
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    monitor.shutdown().await;
    if let Err(e) = store.close().await {
        error!("failed to close alert store: {e}");
    }

    Ok(())
}
