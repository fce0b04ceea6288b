//! kubewarnd - cluster warning relay daemon.
//!
//! Watches the Kubernetes events API for warning-severity events,
//! deduplicates them, and posts novel ones to a Slack webhook.

mod config;
mod health;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kubewarn_core::cache::run_sweeper;
use kubewarn_core::{DedupCache, DedupEngine};
use kubewarn_notify::{ConsoleLinks, SlackConfig, SlackNotifier};
use kubewarn_watch::{deliver_loop, ApiEventSource, Relay};

use crate::config::{Cli, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::resolve(Cli::parse())?;
    info!(
        api = %config.api.base_url,
        listen = %config.listen_addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "starting kubewarnd"
    );

    let cache = DedupCache::new(config.cache_ttl);
    let engine = DedupEngine::new(cache.clone());
    tokio::spawn(run_sweeper(cache, config.sweep_interval));

    let notifier = SlackNotifier::new(
        SlackConfig::new(&config.webhook_url)?,
        ConsoleLinks::new(&config.console_url),
    )?;

    let (tx, rx) = mpsc::channel(config.relay.queue_capacity);
    tokio::spawn(deliver_loop(rx, notifier));

    let listen_addr = config.listen_addr;
    tokio::spawn(async move {
        if let Err(e) = health::serve(listen_addr).await {
            error!(error = %e, "liveness server failed");
        }
    });

    let source = ApiEventSource::new(config.api.clone())?;
    let relay = Relay::new(source, engine, config.relay);

    // Runs until the delivery task drops its receiver.
    relay.run(tx).await?;
    Ok(())
}
