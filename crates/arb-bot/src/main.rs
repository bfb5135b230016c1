//! arb-bot: cross-venue delta-neutral arbitrage executor.
//!
//! Usage:
//!   arb-bot [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>   Config file path (default: config/bot.toml)
//!   --testnet             Force testnet endpoints (overrides config)
//!   --log-level <LEVEL>   Logging level (overrides config)

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use arb_bot::config::BotConfig;
use arb_bot::data_source::binance::BinanceMarketStream;
use arb_bot::data_source::hyperliquid::HyperliquidStream;
use arb_bot::executor::binance::BinanceClient;
use arb_bot::executor::hyperliquid::HyperliquidClient;
use arb_bot::executor::live::LiveExecutor;
use arb_bot::reconcile::{determine_initial_state, ReconcileError};
use arb_bot::scheduler::run_ticker;
use arb_bot::strategy::{StrategyConfig, StrategyHandle, StrategyMachine};
use arb_bot::user_stream::binance::BinanceUserStream;
use arb_bot::PriceBoard;

/// CLI arguments for arb-bot.
#[derive(Parser, Debug)]
#[command(name = "arb-bot")]
#[command(about = "Cross-venue delta-neutral arbitrage executor")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/bot.toml")]
    config: PathBuf,

    /// Force testnet endpoints
    #[arg(long)]
    testnet: bool,

    /// Logging level override
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Credentials may live in a .env file next to the binary.
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        BotConfig::from_file(&args.config)
            .with_context(|| format!("failed to load config from {:?}", args.config))?
    } else {
        eprintln!("Config file not found at {:?}, using defaults", args.config);
        BotConfig::default()
    };
    config.apply_env_overrides();
    if args.testnet {
        config.testnet = true;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.resolve_endpoints();
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(testnet = config.testnet, "arb-bot starting");

    // Venue clients. The Hyperliquid connect resolves asset metadata;
    // Binance filters come from exchangeInfo. The strategy caches both
    // and re-fetches them if a venue rejects an order on a precision
    // filter.
    let binance = BinanceClient::new(&config.venues)?;
    let hyperliquid = HyperliquidClient::connect(&config.venues)
        .await
        .context("connecting Hyperliquid client")?;
    let cex_filters = binance
        .symbol_filters(&config.venues.cex_symbol)
        .await
        .context("fetching Binance symbol filters")?;
    let dex_filters = hyperliquid.filters();

    // Startup reconciliation decides the initial state or refuses.
    let initial = match determine_initial_state(
        &binance,
        &hyperliquid,
        &config.venues.cex_symbol,
        dex_filters.step_size,
    )
    .await
    {
        Ok(initial) => initial,
        Err(e @ ReconcileError::PositionMismatch { .. }) => {
            error!(error = %e, "refusing to start");
            anyhow::bail!("position mismatch: {}", e);
        }
        Err(e) => return Err(e).context("startup reconciliation"),
    };

    let board = Arc::new(PriceBoard::new(config.fees, &config.trading));
    let executor = Arc::new(LiveExecutor::new(binance, hyperliquid));

    let strategy_cfg = StrategyConfig {
        cex_symbol: config.venues.cex_symbol.clone(),
        dex_symbol: config.venues.dex_symbol.clone(),
        cycle_qty: config.trading.cycle_qty,
        min_spread_threshold: config.trading.min_spread_threshold,
        t_order: config.timeouts.t_order(),
        t_cancel: config.timeouts.t_cancel(),
        n_cancel_retry: config.timeouts.n_cancel_retry,
        chase_limit_attempts: config.timeouts.chase_limit_attempts,
        cex_filters,
        dex_filters,
    };
    let machine = StrategyMachine::new(strategy_cfg, Arc::clone(&executor), Arc::clone(&board), initial);
    let strategy = StrategyHandle::new(machine);

    let (shutdown_tx, _) = broadcast::channel(4);

    let cex_stream = BinanceMarketStream::new(&config.venues.cex_ws_url, &config.venues.cex_symbol);
    let dex_stream = HyperliquidStream::new(
        &config.venues.dex_ws_url,
        &config.venues.dex_symbol,
        &config.venues.dex_wallet,
    );
    let user_stream = BinanceUserStream::new(&config.venues.cex_ws_url);

    let mut tasks = Vec::new();
    {
        let board = Arc::clone(&board);
        let strategy = strategy.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            cex_stream.run(board, strategy, shutdown).await;
        }));
    }
    {
        let board = Arc::clone(&board);
        let strategy = strategy.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            dex_stream.run(board, strategy, shutdown).await;
        }));
    }
    {
        let executor = Arc::clone(&executor);
        let strategy = strategy.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            user_stream.run(executor.binance(), strategy, shutdown).await;
        }));
    }
    {
        let strategy = strategy.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            run_ticker(strategy, shutdown).await;
        }));
    }

    info!("all tasks running; Ctrl+C to stop");
    wait_for_shutdown().await;

    info!("shutting down");
    let _ = shutdown_tx.send(());
    strategy.cancel_inflight().await;
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "task join failed");
        }
    }
    info!("arb-bot stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("sigterm handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
