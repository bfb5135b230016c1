//! In-memory L2 order book.
//!
//! Books are rebuilt from every venue push and replaced wholesale; there
//! is no incremental mutation. Downstream consumers only ever read the
//! top of book, but full depth is kept for sizing diagnostics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Side, Venue};

/// A single price level: immutable `(price, size, order_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
    /// Number of resting orders at this price (1 where the venue
    /// does not report it).
    pub orders: u32,
}

impl Level {
    pub fn new(price: Decimal, size: Decimal, orders: u32) -> Self {
        Self { price, size, orders }
    }
}

/// Validation failures for a parsed book.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("crossed book: best bid {bid} >= best ask {ask}")]
    Crossed { bid: Decimal, ask: Decimal },

    #[error("non-positive size at price {price}")]
    NonPositiveSize { price: Decimal },

    #[error("duplicate price level {price}")]
    DuplicatePrice { price: Decimal },

    #[error("levels out of order at price {price}")]
    OutOfOrder { price: Decimal },
}

/// Level-2 order book snapshot for one venue/symbol.
///
/// Bids are ordered descending by price, asks ascending. `seq` is the
/// venue's monotonic update id (0 where the venue does not publish one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L2Book {
    pub venue: Venue,
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub seq: u64,
    pub ts: DateTime<Utc>,
}

impl L2Book {
    pub fn new(
        venue: Venue,
        symbol: impl Into<String>,
        bids: Vec<Level>,
        asks: Vec<Level>,
        seq: u64,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            bids,
            asks,
            seq,
            ts,
        }
    }

    /// Best bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Mid price, if both sides are present.
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some((bid + ask) / Decimal::TWO)
    }

    /// Top-of-book spread.
    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask - bid)
    }

    /// Sum of sizes over the top `n` levels of one side.
    pub fn depth(&self, side: Side, n: usize) -> Decimal {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.iter().take(n).map(|l| l.size).sum()
    }

    /// Both sides present.
    pub fn is_valid(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    /// Check the book invariants: top bid < top ask, all sizes positive,
    /// no duplicate prices, sides properly ordered.
    pub fn validate(&self) -> Result<(), BookError> {
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                return Err(BookError::Crossed { bid, ask });
            }
        }
        for level in self.bids.iter().chain(self.asks.iter()) {
            if level.size <= Decimal::ZERO {
                return Err(BookError::NonPositiveSize { price: level.price });
            }
        }
        for pair in self.bids.windows(2) {
            if pair[1].price == pair[0].price {
                return Err(BookError::DuplicatePrice { price: pair[1].price });
            }
            if pair[1].price > pair[0].price {
                return Err(BookError::OutOfOrder { price: pair[1].price });
            }
        }
        for pair in self.asks.windows(2) {
            if pair[1].price == pair[0].price {
                return Err(BookError::DuplicatePrice { price: pair[1].price });
            }
            if pair[1].price < pair[0].price {
                return Err(BookError::OutOfOrder { price: pair[1].price });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(bids: Vec<Level>, asks: Vec<Level>) -> L2Book {
        L2Book::new(Venue::Hyperliquid, "BTC", bids, asks, 1, Utc::now())
    }

    #[test]
    fn test_top_of_book() {
        let b = book(
            vec![
                Level::new(dec!(30019), dec!(0.5), 3),
                Level::new(dec!(30018), dec!(1.2), 1),
            ],
            vec![
                Level::new(dec!(30021), dec!(0.4), 2),
                Level::new(dec!(30022), dec!(0.9), 5),
            ],
        );
        assert_eq!(b.best_bid(), Some(dec!(30019)));
        assert_eq!(b.best_ask(), Some(dec!(30021)));
        assert_eq!(b.mid_price(), Some(dec!(30020)));
        assert_eq!(b.spread(), Some(dec!(2)));
        assert!(b.is_valid());
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_depth() {
        let b = book(
            vec![
                Level::new(dec!(100), dec!(1), 1),
                Level::new(dec!(99), dec!(2), 1),
                Level::new(dec!(98), dec!(3), 1),
            ],
            vec![Level::new(dec!(101), dec!(4), 1)],
        );
        assert_eq!(b.depth(Side::Buy, 2), dec!(3));
        assert_eq!(b.depth(Side::Buy, 10), dec!(6));
        assert_eq!(b.depth(Side::Sell, 1), dec!(4));
    }

    #[test]
    fn test_validate_crossed() {
        let b = book(
            vec![Level::new(dec!(101), dec!(1), 1)],
            vec![Level::new(dec!(100), dec!(1), 1)],
        );
        assert_eq!(
            b.validate(),
            Err(BookError::Crossed {
                bid: dec!(101),
                ask: dec!(100)
            })
        );
    }

    #[test]
    fn test_validate_bad_sizes_and_order() {
        let b = book(
            vec![Level::new(dec!(100), dec!(0), 1)],
            vec![Level::new(dec!(101), dec!(1), 1)],
        );
        assert!(matches!(b.validate(), Err(BookError::NonPositiveSize { .. })));

        let b = book(
            vec![
                Level::new(dec!(99), dec!(1), 1),
                Level::new(dec!(100), dec!(1), 1),
            ],
            vec![Level::new(dec!(101), dec!(1), 1)],
        );
        assert!(matches!(b.validate(), Err(BookError::OutOfOrder { .. })));

        let b = book(
            vec![Level::new(dec!(100), dec!(1), 1)],
            vec![
                Level::new(dec!(101), dec!(1), 1),
                Level::new(dec!(101), dec!(2), 1),
            ],
        );
        assert!(matches!(b.validate(), Err(BookError::DuplicatePrice { .. })));
    }

    #[test]
    fn test_empty_book() {
        let b = book(vec![], vec![]);
        assert!(!b.is_valid());
        assert!(b.mid_price().is_none());
        assert_eq!(b.depth(Side::Buy, 5), Decimal::ZERO);
        assert!(b.validate().is_ok());
    }
}
