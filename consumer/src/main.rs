//! Marketfeed parking consumer - Main entry point
//!
//! Runs the parking scenario against the demo marketplace.

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketfeed_consumer::{
    demo_marketplace, run_scenario, ConsumerAppConfig, ScenarioTimings, VERSION,
};

/// Feed polling interval used with `--fast`
const FAST_INTERVAL_MS: u64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let matches = Command::new("marketfeed-consumer")
        .version(VERSION)
        .about("Marketfeed parking consumer - discover, access and follow parking offerings")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("OUTPUT")
                .help("Generate example config and exit"),
        )
        .arg(
            Arg::new("fast")
                .long("fast")
                .help("Shorten scenario delays and the feed interval")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(log_level);

    // Handle config generation
    if let Some(output_path) = matches.get_one::<String>("generate-config") {
        ConsumerAppConfig::default()
            .save_to_file(output_path)
            .with_context(|| format!("writing config to {}", output_path))?;
        info!("Generated example config at: {}", output_path);
        return Ok(());
    }

    info!(version = VERSION, "Marketfeed consumer starting");

    let mut config = match matches.get_one::<String>("config") {
        Some(config_path) => {
            info!("Loading config from: {}", config_path);
            ConsumerAppConfig::from_file(config_path)?
        }
        None => ConsumerAppConfig::load()?,
    };

    if matches.get_flag("fast") {
        warn!("Running with shortened delays");
        config.timings = ScenarioTimings::fast();
        config.feeds.default_interval_ms = FAST_INTERVAL_MS;
    }

    let marketplace = Arc::new(demo_marketplace(&config));

    tokio::select! {
        result = run_scenario(marketplace, &config) => {
            match result {
                Ok(report) => info!(
                    offering = %report.offering,
                    parking_spaces = report.parking.len(),
                    feed_successes = report.feed_successes,
                    "Scenario completed"
                ),
                Err(e) => {
                    error!(category = e.category(), error = %e, "Scenario failed");
                    return Err(e.into());
                }
            }
        }
        _ = setup_shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Marketfeed consumer stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "marketfeed_consumer={0},marketfeed_feedcontrol={0},marketfeed_marketplace={0}",
                    level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Set up graceful shutdown signal handling
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
