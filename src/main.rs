use std::sync::Arc;

use clap::{Parser, Subcommand};

use alerter::TelegramAlerter;
use api_client::{BrokerApi, BrokerClient};
use core_types::Market;
use engine::{Controller, MarketTrader};
use scheduler::SessionClock;

// ==============================================================================
// CLI Structure
// ==============================================================================

#[derive(Parser)]
#[command(name = "meridian")]
#[command(about = "A dual-market, rule-based portfolio execution daemon", long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading daemon until interrupted.
    Run,
    /// Print both markets' target portfolio reports and exit.
    Targets,
}

// ==============================================================================
// Main Application Entry
// ==============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually arrive via the environment; a missing .env is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = configuration::load_config(&cli.config)?;

    let clock = SessionClock::new(config.session.utc_offset_hours);

    let domestic_api: Arc<dyn BrokerApi> = Arc::new(BrokerClient::new(
        Market::Domestic,
        config.domestic.clone(),
        &config.trading.data_dir,
    ));
    let overseas_api: Arc<dyn BrokerApi> = Arc::new(BrokerClient::new(
        Market::Overseas,
        config.overseas.clone(),
        &config.trading.data_dir,
    ));

    let (notifier, rx) = alerter::channel();
    match TelegramAlerter::new(&config.telegram) {
        Some(telegram) => {
            tokio::spawn(alerter::run_alerter_service(telegram, rx));
        }
        None => {
            tracing::warn!("Telegram is not configured; alerts will only be logged.");
            // Keep the receiver alive so enqueues log at the call site
            // instead of hitting a closed channel.
            tokio::spawn(async move {
                let mut rx = rx;
                while let Some(message) = rx.recv().await {
                    tracing::info!(alert = %message, "Alert (no delivery channel).");
                }
            });
        }
    }

    let domestic = MarketTrader::new(
        Market::Domestic,
        domestic_api,
        &config.domestic,
        &config.trading,
        clock,
        notifier.clone(),
    );
    let overseas = MarketTrader::new(
        Market::Overseas,
        overseas_api,
        &config.overseas,
        &config.trading,
        clock,
        notifier.clone(),
    );

    match cli.command {
        Commands::Run => {
            tracing::info!("Starting the dual-market trading daemon.");
            Controller::new(domestic, overseas, clock, notifier, &config.trading)
                .run()
                .await;
        }
        Commands::Targets => {
            println!("{}", domestic.preopen_report()?);
            println!();
            println!("{}", overseas.preopen_report()?);
        }
    }

    Ok(())
}
