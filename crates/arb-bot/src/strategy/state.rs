//! Strategy states, the active-order slot, and the position ledger.

use std::fmt;
use std::time::Instant;

use rust_decimal::Decimal;

use arb_common::{Side, Venue};

/// The ten states of the two-leg protocol. Exactly one at a time.
///
/// Leg1 is always the DEX maker leg, Leg2 always the CEX taker hedge,
/// for both the open and the close traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// Flat, scanning for an open signal.
    OpenCondition,
    /// DEX maker buy resting.
    OpenLeg1Waiting,
    /// DEX cancel in flight.
    OpenLeg1Canceling,
    /// CEX hedge sell working.
    OpenLeg2Waiting,
    /// CEX hedge sell reposted after a partial/cancel.
    OpenLeg2Chasing,
    /// Hedged, scanning for a close signal.
    CloseCondition,
    /// DEX maker sell resting.
    CloseLeg1Waiting,
    /// DEX cancel in flight.
    CloseLeg1Canceling,
    /// CEX hedge buy working.
    CloseLeg2Waiting,
    /// CEX hedge buy reposted after a partial/cancel.
    CloseLeg2Chasing,
}

impl StrategyState {
    /// Idle scanning states: no active order, signals are evaluated.
    pub fn is_condition(&self) -> bool {
        matches!(self, StrategyState::OpenCondition | StrategyState::CloseCondition)
    }

    /// True for the open-side traversal (including `OpenCondition`).
    pub fn is_open_cycle(&self) -> bool {
        matches!(
            self,
            StrategyState::OpenCondition
                | StrategyState::OpenLeg1Waiting
                | StrategyState::OpenLeg1Canceling
                | StrategyState::OpenLeg2Waiting
                | StrategyState::OpenLeg2Chasing
        )
    }

    /// The condition state that governs this state's cycle.
    pub fn governing_condition(&self) -> StrategyState {
        if self.is_open_cycle() {
            StrategyState::OpenCondition
        } else {
            StrategyState::CloseCondition
        }
    }

    pub fn is_leg1(&self) -> bool {
        matches!(
            self,
            StrategyState::OpenLeg1Waiting
                | StrategyState::OpenLeg1Canceling
                | StrategyState::CloseLeg1Waiting
                | StrategyState::CloseLeg1Canceling
        )
    }

    pub fn is_leg2(&self) -> bool {
        matches!(
            self,
            StrategyState::OpenLeg2Waiting
                | StrategyState::OpenLeg2Chasing
                | StrategyState::CloseLeg2Waiting
                | StrategyState::CloseLeg2Chasing
        )
    }
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyState::OpenCondition => "OpenCondition",
            StrategyState::OpenLeg1Waiting => "OpenLeg1Waiting",
            StrategyState::OpenLeg1Canceling => "OpenLeg1Canceling",
            StrategyState::OpenLeg2Waiting => "OpenLeg2Waiting",
            StrategyState::OpenLeg2Chasing => "OpenLeg2Chasing",
            StrategyState::CloseCondition => "CloseCondition",
            StrategyState::CloseLeg1Waiting => "CloseLeg1Waiting",
            StrategyState::CloseLeg1Canceling => "CloseLeg1Canceling",
            StrategyState::CloseLeg2Waiting => "CloseLeg2Waiting",
            StrategyState::CloseLeg2Chasing => "CloseLeg2Chasing",
        };
        write!(f, "{}", s)
    }
}

/// The single active order slot. At most one order per leg is in flight.
#[derive(Debug, Clone)]
pub struct ActiveOrder {
    pub venue: Venue,
    pub symbol: String,
    pub side: Side,
    pub order_id: String,
    pub client_id: String,
    /// Limit price; `None` for market orders.
    pub price: Option<Decimal>,
    pub qty_total: Decimal,
    /// Cumulative filled quantity as last reported by the venue.
    pub qty_filled: Decimal,
    pub placed_at: Instant,
    pub chase_attempt: u32,
}

impl ActiveOrder {
    /// Unfilled remainder.
    pub fn remaining(&self) -> Decimal {
        (self.qty_total - self.qty_filled).max(Decimal::ZERO)
    }
}

/// In-memory position bookkeeping for the current cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionLedger {
    /// Hedge size currently open (DEX long = CEX short).
    pub held_qty: Decimal,
    /// Cumulative Leg1 fill for the cycle in progress; the exact target
    /// Leg2 hedges. Leg2 never places more than this.
    pub leg1_filled_qty: Decimal,
    /// Cumulative Leg2 fill for the cycle in progress.
    pub leg2_filled_qty: Decimal,
    /// Working quantity for the cycle in progress.
    pub cycle_qty: Decimal,
}

impl PositionLedger {
    pub fn begin_cycle(&mut self, qty: Decimal) {
        self.cycle_qty = qty;
        self.leg1_filled_qty = Decimal::ZERO;
        self.leg2_filled_qty = Decimal::ZERO;
    }

    pub fn reset_cycle(&mut self) {
        self.cycle_qty = Decimal::ZERO;
        self.leg1_filled_qty = Decimal::ZERO;
        self.leg2_filled_qty = Decimal::ZERO;
    }

    /// Remainder Leg2 still has to hedge.
    pub fn leg2_remaining(&self) -> Decimal {
        (self.leg1_filled_qty - self.leg2_filled_qty).max(Decimal::ZERO)
    }
}
