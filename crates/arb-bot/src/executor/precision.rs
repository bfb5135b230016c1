//! Per-venue price/quantity precision handling.
//!
//! Filters are loaded from venue symbol metadata once at startup and
//! cached; a reject that looks filter-shaped triggers a re-fetch.
//!
//! Rounding policy: maker prices round toward the passive side (the
//! order must rest inside the book, never cross); taker prices round
//! toward the aggressive side. Quantities always round down to the lot,
//! and a quantity that rounds to zero aborts the cycle upstream.

use rust_decimal::Decimal;

use arb_common::Side;

/// Tick/lot increments for one venue symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolFilters {
    /// Price increment.
    pub tick_size: Decimal,
    /// Quantity increment (lot size).
    pub step_size: Decimal,
}

impl SymbolFilters {
    pub fn new(tick_size: Decimal, step_size: Decimal) -> Self {
        Self {
            tick_size,
            step_size,
        }
    }

    /// Round a maker price so the order stays passive.
    ///
    /// Buys round down (must not cross the ask), sells round up.
    pub fn round_price_passive(&self, price: Decimal, side: Side) -> Decimal {
        match side {
            Side::Buy => round_down(price, self.tick_size),
            Side::Sell => round_up(price, self.tick_size),
        }
    }

    /// Round a taker price toward the aggressive side.
    ///
    /// Buys round up, sells round down, so the order still crosses after
    /// rounding.
    pub fn round_price_aggressive(&self, price: Decimal, side: Side) -> Decimal {
        match side {
            Side::Buy => round_up(price, self.tick_size),
            Side::Sell => round_down(price, self.tick_size),
        }
    }

    /// Round a quantity down to the lot size.
    pub fn round_qty_down(&self, qty: Decimal) -> Decimal {
        round_down(qty, self.step_size)
    }
}

fn round_down(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    (value / increment).floor() * increment
}

fn round_up(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    (value / increment).ceil() * increment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_passive_rounding() {
        let f = SymbolFilters::new(dec!(0.1), dec!(0.001));
        // Maker buy: stay at or below the target price.
        assert_eq!(f.round_price_passive(dec!(30020.17), Side::Buy), dec!(30020.1));
        // Maker sell: stay at or above.
        assert_eq!(f.round_price_passive(dec!(30020.11), Side::Sell), dec!(30020.2));
        // Already on tick: unchanged either way.
        assert_eq!(f.round_price_passive(dec!(30020.1), Side::Buy), dec!(30020.1));
        assert_eq!(f.round_price_passive(dec!(30020.1), Side::Sell), dec!(30020.1));
    }

    #[test]
    fn test_aggressive_rounding() {
        let f = SymbolFilters::new(dec!(0.1), dec!(0.001));
        assert_eq!(f.round_price_aggressive(dec!(30020.11), Side::Buy), dec!(30020.2));
        assert_eq!(f.round_price_aggressive(dec!(30020.17), Side::Sell), dec!(30020.1));
    }

    #[test]
    fn test_qty_rounds_down_to_lot() {
        let f = SymbolFilters::new(dec!(0.1), dec!(0.001));
        assert_eq!(f.round_qty_down(dec!(0.0045)), dec!(0.004));
        assert_eq!(f.round_qty_down(dec!(0.004)), dec!(0.004));
        // Below one lot rounds to zero; the cycle aborts upstream.
        assert_eq!(f.round_qty_down(dec!(0.0009)), dec!(0.000));
        assert!(f.round_qty_down(dec!(0.0009)).is_zero());
    }

    #[test]
    fn test_zero_increment_passthrough() {
        let f = SymbolFilters::new(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(f.round_price_passive(dec!(1.23), Side::Buy), dec!(1.23));
        assert_eq!(f.round_qty_down(dec!(1.23)), dec!(1.23));
    }
}
