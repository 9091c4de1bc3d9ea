//! Host metrics receiver.
//!
//! Scrapes local CPU, disk, paging, process and load counters on a fixed
//! interval and writes each batch to stdout.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use hostmetrics_common::{encode, init_tracing};
use hostmetrics_receiver::ReceiverArgs;
use hostmetrics_receiver::config::ReceiverConfig;
use hostmetrics_receiver::runner::ScrapeRunner;
use hostmetrics_receiver::scraper::ScrapeContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = ReceiverArgs::parse_with_default("hostmetrics.json5");

    let mut config = ReceiverConfig::load_from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting host metrics receiver");

    let cancel = CancellationToken::new();
    let mut runner = ScrapeRunner::from_config(
        &config.scrapers,
        ScrapeContext::with_cancellation(cancel.clone()),
    )?;

    runner.start_all();
    if runner.is_empty() {
        bail!("no scraper could be started");
    }

    tracing::info!(
        scrapers = runner.len(),
        interval_secs = config.collection_interval_secs,
        format = ?config.output.format,
        "Receiver running"
    );

    // Ctrl+C cancels the token, also mid-scrape
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutting down"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        shutdown.cancel();
    });

    let mut interval = tokio::time::interval(Duration::from_secs(config.collection_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Scrapers read the OS synchronously
                let (batch, _errors) = tokio::task::block_in_place(|| runner.scrape_all());
                if cancel.is_cancelled() {
                    break;
                }

                let payload = encode(&batch, config.output.format)?;
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&payload)?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
        }
    }

    Ok(())
}
