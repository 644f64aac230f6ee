pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod hierarchy;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init` must work before a valid config exists.
    if let Some(Commands::Init) = cli.command {
        return cli::cmd_init();
    }

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    match cli.command {
        Some(Commands::Serve) => run_server(config, prometheus_handle).await,
        Some(Commands::Init) => cli::cmd_init(),
        Some(Commands::Ancestors { code }) => cli::cmd_ancestors(&config, &code).await,
        Some(Commands::Descendants { code, max_depth }) => {
            cli::cmd_descendants(&config, &code, max_depth).await
        }
        Some(Commands::Team { code, max_depth }) => cli::cmd_team(&config, &code, max_depth).await,
        None => {
            print_help();
            Ok(())
        }
    }
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("kinship v{} starting...", env!("CARGO_PKG_VERSION"));

    let host = config.server.host.clone();
    let port = config.server.port;

    let shared = Arc::new(SharedState::new(config).await?);
    let scheduler = shared.sweeper.start().await?;

    let api_state = api::create_app_state(shared, prometheus_handle);
    let app = api::router(api_state).await;

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    if let Some(mut sched) = scheduler
        && let Err(e) = sched.shutdown().await
    {
        error!("Failed to stop expiry sweeper: {}", e);
    }
    server_handle.abort();
    info!("Server stopped");

    Ok(())
}

fn print_help() {
    println!("kinship v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("  kinship <command> [options]");
    println!();
    println!("COMMANDS:");
    println!("  serve                               Run the HTTP API");
    println!("  init                                Create default config.toml");
    println!("  ancestors <code>                    Show an account's upline");
    println!("  descendants <code> [--max-depth N]  Show an account's downline");
    println!("  team <code> [--max-depth N]         Show downline counts per level");
}
