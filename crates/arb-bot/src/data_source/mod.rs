//! Market-data ingress.
//!
//! One task per venue socket. DEX book updates land on the price board
//! silently; CEX book updates land and then trigger a signal check —
//! CEX ticks arrive with strictly fresher end-to-end latency and act as
//! the sampling clock, which keeps signal churn bounded.
//!
//! These adapters are the only place venue-specific wire shapes appear.

pub mod binance;
pub mod hyperliquid;

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Connection timeout for the initial WebSocket handshake.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Initial reconnect delay; doubles per failure up to the max.
pub(crate) const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
pub(crate) const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Errors that tear down one connection attempt (the run loop
/// reconnects with backoff).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("WebSocket connection failed: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("Connection timeout")]
    Timeout,

    #[error("Stream ended unexpectedly")]
    StreamEnded,
}
