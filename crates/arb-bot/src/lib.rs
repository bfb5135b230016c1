//! Cross-venue delta-neutral arbitrage executor.
//!
//! Monitors top-of-book on a centralized futures exchange (Binance
//! USD-M) and an on-chain perpetuals venue (Hyperliquid) and trades a
//! hedged pair whenever the fee-adjusted inter-venue spread clears the
//! configured threshold. The passive leg always rests on the DEX; the
//! hedge always takes on the CEX.
//!
//! ## Modules
//!
//! - `config`: TOML configuration with env-var credential overrides
//! - `board`: latest bid/ask per venue and the fee-aware net spread
//! - `data_source`: per-venue WebSocket market-data adapters
//! - `executor`: uniform place/cancel over both venues
//! - `strategy`: the two-leg open/close state machine
//! - `user_stream`: order-event normalization and stream lifecycles
//! - `reconcile`: startup balance/position check
//! - `scheduler`: 1 Hz timeout and signal tick

pub mod board;
pub mod config;
pub mod data_source;
pub mod executor;
pub mod reconcile;
pub mod scheduler;
pub mod user_stream;
pub mod strategy;

pub use board::{EdgePair, PriceBoard};
pub use config::{BotConfig, FeeSchedule, TimeoutConfig, TradingConfig, VenueConfig};
pub use executor::{
    CancelOrder, ExecutorError, OrderAck, OrderStatus, PlaceOrder, SymbolFilters, VenueExecutor,
};
pub use executor::live::LiveExecutor;
pub use reconcile::{classify_positions, determine_initial_state, ReconcileError};
pub use strategy::{
    ActiveOrder, InitialPosition, OrderEvent, OrderEventKind, PositionLedger, StrategyConfig,
    StrategyHandle, StrategyMachine, StrategyState,
};
