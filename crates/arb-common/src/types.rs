//! Venue and side identifiers shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Trading venue identifier.
///
/// The same instrument carries distinct identifiers per venue
/// (e.g. `BTCUSDT` on Binance vs `BTC` on Hyperliquid), so symbols
/// always travel next to a `Venue`, never inferred from one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Centralized futures exchange (Binance USD-M shaped).
    Binance,
    /// On-chain perpetuals venue (Hyperliquid shaped).
    Hyperliquid,
}

impl Venue {
    /// Short display name used in logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            Venue::Binance => "CEX",
            Venue::Hyperliquid => "DEX",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Binance => write!(f, "Binance"),
            Venue::Hyperliquid => write!(f, "Hyperliquid"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation used by both venue APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// The opposing side.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
