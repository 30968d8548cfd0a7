// In app/src/main.rs

use anyhow::Result;
use api_client::MarketData;
use app_config::Settings;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use core_types::Bar;
use engine::{Scheduler, TradingTask};
use execution::{Executor, LiveExecutor};
use notifier::{Notifier, TelegramNotifier};
use risk::PositionGate;
use std::sync::Arc;
use strategies::{create_indicator, latest_signal, scan_crossovers};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A moving-average crossover bot for Binance USDⓈ-M futures.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the session scheduler and the control server until Ctrl-C.
    Run,

    /// Evaluates the configured symbol once and prints the result.
    /// Never places an order.
    Evaluate,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let cli = Cli::parse();

    // Configuration errors abort startup before anything is spawned.
    let settings = app_config::load_settings()?;
    init_tracing(&settings.app.log_level);
    tracing::info!(environment = %settings.app.environment, "Application settings loaded successfully.");

    match cli.command {
        Commands::Run => run_app(settings).await?,
        Commands::Evaluate => handle_evaluate(&settings).await?,
    }

    Ok(())
}

fn init_tracing(log_level: &str) {
    let level = log_level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("hyper", tracing::Level::WARN)
            .with_target("hyper_util", tracing::Level::WARN)
            .with_target("reqwest", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Handles the logic for the `run` subcommand.
async fn run_app(settings: Settings) -> Result<()> {
    // --- 1. Component Instantiation ---
    if settings.binance.sandbox {
        tracing::info!(rest_url = settings.binance.rest_url(), "Trading against the futures testnet.");
    } else {
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
    }

    let api_client = api_client::new(&settings.binance)?;
    let market_data: Arc<dyn MarketData> = Arc::new(api_client.clone());
    let executor: Arc<dyn Executor> = Arc::new(LiveExecutor::new(api_client));
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(&settings.telegram, settings.binance.request_timeout())?);

    let task = TradingTask::new(&settings.trading, &settings.schedule, market_data, executor, notifier)?;

    // --- 2. Scheduler and Autostart ---
    let scheduler = Arc::new(Scheduler::new(Arc::new(task), &settings.schedule));
    for session in settings.schedule.autostart() {
        scheduler.start(session).await?;
    }

    // --- 3. Control Server ---
    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(web_server::run(settings.server.clone(), scheduler.clone(), shutdown.clone()));

    let server_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Ctrl-C received. Shutting down.");
            None
        }
        joined = &mut server => {
            tracing::error!("Web server exited unexpectedly. Shutting down.");
            Some(joined)
        }
    };

    // --- 4. Shutdown ---
    shutdown.cancel();
    scheduler.shutdown().await;

    let joined = match server_exit {
        Some(joined) => joined,
        None => server.await,
    };
    joined??;

    tracing::info!("Shutdown complete.");
    Ok(())
}

/// Handles the logic for the `evaluate` subcommand.
async fn handle_evaluate(settings: &Settings) -> Result<()> {
    let trading = &settings.trading;
    let symbol = trading.symbol();
    let client = api_client::new(&settings.binance)?;
    let indicator = create_indicator(&trading.indicator)?;

    let now = Utc::now().timestamp_millis();
    let bars: Vec<Bar> = client
        .fetch_bars(&symbol, &trading.timeframe, trading.bar_limit)
        .await?
        .into_iter()
        .filter(|bar| trading.evaluate_forming_bar || bar.is_closed_at(now))
        .collect();
    let position = client.fetch_position(&symbol).await?;
    let states = indicator.compute(&bars);

    println!(
        "{} {} | {} bars | {}({}, {}) | position {}",
        symbol,
        trading.timeframe,
        bars.len(),
        indicator.name(),
        trading.indicator.fast_period,
        trading.indicator.slow_period,
        position.signed_quantity
    );

    match states.last() {
        Some(Some(state)) => println!("Latest: fast = {:.4}, slow = {:.4}", state.fast, state.slow),
        _ => println!("Not enough bars: {} required.", indicator.required_bars()),
    }

    let crossovers = scan_crossovers(&states);
    println!("Crossovers in window: {}", crossovers.len());
    for (index, direction) in crossovers {
        if let Some(bar) = bars.get(index) {
            println!("  {:<4} at {} | close {}", direction.as_str(), format_millis(bar.open_time), bar.close);
        }
    }

    match latest_signal(&bars, &states) {
        Some(signal) => {
            let verdict = if PositionGate::is_actionable(signal.direction, &position) {
                "actionable"
            } else {
                "not actionable (position already open)"
            };
            println!("Latest bar: {} at {} is {}.", signal.direction, signal.price, verdict);
        }
        None => println!("Latest bar: no crossover."),
    }

    Ok(())
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}
