use anyhow::Context;
use clap::Parser;
use seaway_core::{AggregationPolicy, Aggregator, Config};
use std::{path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::routes;

/// Top-level CLI struct. Flags override the config file and environment.
#[derive(Debug, Parser)]
#[command(name = "seaway", version, about = "Seaway weather-map API server")]
pub struct Cli {
    /// Path to a TOML config file; defaults to the platform config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind to.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Aggregation policy for /weather-map: "fail-fast" or "best-effort".
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<AggregationPolicy>,

    /// Log filter (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_policy(value: &str) -> Result<AggregationPolicy, String> {
    AggregationPolicy::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Resolve the effective configuration: file, then environment, then flags.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(policy) = self.policy {
            config.aggregation = policy;
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        init_tracing(&self.log_level);

        let config = self.config()?;
        let aggregator = Aggregator::from_config(&config)?;

        tracing::info!(
            policy = %aggregator.policy(),
            cache_capacity = config.cache.capacity,
            timeout_secs = config.http.timeout().as_secs(),
            "starting Seaway API v{}",
            env!("CARGO_PKG_VERSION")
        );

        let app = routes::router(Arc::new(aggregator));

        let addr = (config.server.host.as_str(), config.server.port);
        let listener = TcpListener::bind(addr).await.with_context(|| {
            format!("Failed to bind {}:{}", config.server.host, config.server.port)
        })?;

        tracing::info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        tracing::info!("server stopped");
        Ok(())
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
        Err(err) => tracing::error!("unable to listen for shutdown signal: {err}"),
    }
}
