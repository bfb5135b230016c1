//! Thread-safe latest bid/ask per venue with fee-adjusted net spread.
//!
//! The board is pure memory: no I/O, no history. Entries are overwritten
//! on every update and expire after `max_quote_age`, so a stalled stream
//! silently disables the signal instead of trading on stale prices.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use arb_common::{Side, Venue};

use crate::config::{FeeSchedule, TradingConfig};

/// Price snapshot for one venue.
#[derive(Debug, Clone, Copy)]
struct Quote {
    bid: Decimal,
    ask: Decimal,
    at: Instant,
}

/// Fee-adjusted edges for the two cycle directions.
///
/// The maker leg is always the DEX (thinner book, better price capture),
/// the taker leg always the CEX (guaranteed hedge fill):
///
/// ```text
/// open_edge  = dex_bid * (1 - dex_maker) - cex_ask * (1 + cex_taker)
/// close_edge = cex_bid * (1 - cex_maker) - dex_ask * (1 + dex_taker)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePair {
    pub open_edge: Decimal,
    pub close_edge: Decimal,
}

#[derive(Debug, Default)]
struct Quotes {
    cex: Option<Quote>,
    dex: Option<Quote>,
}

/// Rejected quote updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("crossed or empty quote: bid {bid} >= ask {ask}")]
    Crossed { bid: Decimal, ask: Decimal },

    #[error("non-positive quote: bid {bid}, ask {ask}")]
    NonPositive { bid: Decimal, ask: Decimal },
}

/// Latest top-of-book per venue behind a single mutex.
///
/// All reads take the mutex, so a `(bid, ask)` pair is never torn.
#[derive(Debug)]
pub struct PriceBoard {
    quotes: Mutex<Quotes>,
    fees: FeeSchedule,
    max_quote_age: Duration,
}

impl PriceBoard {
    pub fn new(fees: FeeSchedule, trading: &TradingConfig) -> Self {
        Self {
            quotes: Mutex::new(Quotes::default()),
            fees,
            max_quote_age: trading.max_quote_age(),
        }
    }

    /// Atomically replace a venue's quote.
    ///
    /// Rejects crossed (`bid >= ask`) and non-positive quotes.
    pub fn update(&self, venue: Venue, bid: Decimal, ask: Decimal) -> Result<(), QuoteError> {
        if bid <= Decimal::ZERO || ask <= Decimal::ZERO {
            return Err(QuoteError::NonPositive { bid, ask });
        }
        if bid >= ask {
            return Err(QuoteError::Crossed { bid, ask });
        }
        let quote = Quote {
            bid,
            ask,
            at: Instant::now(),
        };
        let mut quotes = self.quotes.lock().expect("price board poisoned");
        match venue {
            Venue::Binance => quotes.cex = Some(quote),
            Venue::Hyperliquid => quotes.dex = Some(quote),
        }
        Ok(())
    }

    /// Latest price for one venue and side, if fresh.
    pub fn get(&self, venue: Venue, side: Side) -> Option<Decimal> {
        let quotes = self.quotes.lock().expect("price board poisoned");
        let quote = match venue {
            Venue::Binance => quotes.cex?,
            Venue::Hyperliquid => quotes.dex?,
        };
        if quote.at.elapsed() > self.max_quote_age {
            return None;
        }
        match side {
            Side::Buy => Some(quote.bid),
            Side::Sell => Some(quote.ask),
        }
    }

    /// Fee-adjusted `(open_edge, close_edge)` from the freshest snapshot.
    ///
    /// Returns `None` until both venues have a fresh quote.
    pub fn net_spread(&self) -> Option<EdgePair> {
        let quotes = self.quotes.lock().expect("price board poisoned");
        let cex = quotes.cex?;
        let dex = quotes.dex?;
        if cex.at.elapsed() > self.max_quote_age || dex.at.elapsed() > self.max_quote_age {
            return None;
        }

        let open_edge = dex.bid * (Decimal::ONE - self.fees.dex_maker_fee)
            - cex.ask * (Decimal::ONE + self.fees.cex_taker_fee);
        let close_edge = cex.bid * (Decimal::ONE - self.fees.cex_maker_fee)
            - dex.ask * (Decimal::ONE + self.fees.dex_taker_fee);

        Some(EdgePair {
            open_edge,
            close_edge,
        })
    }
}
