//! User-stream ingress: venue order updates normalized into the three
//! terminal event kinds the strategy understands.
//!
//! The Binance user stream runs on its own listen-key socket; the
//! Hyperliquid `orderUpdates` subscription rides the market-data socket
//! (see `data_source::hyperliquid`), so only its parser lives here.

pub mod binance;
pub mod hyperliquid;
