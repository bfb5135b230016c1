//! Normalized user-stream order events.
//!
//! Both venues' heterogeneous order updates collapse into three terminal
//! kinds. `filled_qty` is always the venue's cumulative fill for the
//! order, never an increment; the machine derives remainders itself.

use rust_decimal::Decimal;

use arb_common::Venue;

/// Terminal order event delivered by a user-stream adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEvent {
    pub venue: Venue,
    pub order_id: String,
    pub kind: OrderEventKind,
}

/// What terminated the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventKind {
    /// Fully filled; `filled_qty` is the cumulative total.
    AllTraded { filled_qty: Decimal },
    /// Canceled after a partial fill; `filled_qty > 0` is cumulative.
    PartialFilledCanceled { filled_qty: Decimal },
    /// Canceled (or rejected/expired) with no fill.
    AllCanceled,
}

impl OrderEventKind {
    /// Cumulative filled quantity carried by the event.
    pub fn filled_qty(&self) -> Decimal {
        match self {
            OrderEventKind::AllTraded { filled_qty }
            | OrderEventKind::PartialFilledCanceled { filled_qty } => *filled_qty,
            OrderEventKind::AllCanceled => Decimal::ZERO,
        }
    }
}

impl OrderEvent {
    pub fn all_traded(venue: Venue, order_id: impl Into<String>, filled_qty: Decimal) -> Self {
        Self {
            venue,
            order_id: order_id.into(),
            kind: OrderEventKind::AllTraded { filled_qty },
        }
    }

    pub fn partial_filled_canceled(
        venue: Venue,
        order_id: impl Into<String>,
        filled_qty: Decimal,
    ) -> Self {
        Self {
            venue,
            order_id: order_id.into(),
            kind: OrderEventKind::PartialFilledCanceled { filled_qty },
        }
    }

    pub fn all_canceled(venue: Venue, order_id: impl Into<String>) -> Self {
        Self {
            venue,
            order_id: order_id.into(),
            kind: OrderEventKind::AllCanceled,
        }
    }
}
