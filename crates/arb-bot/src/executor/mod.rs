//! Uniform order execution over both venues.
//!
//! The `VenueExecutor` trait is the seam between the strategy and the
//! venue transports. Live trading routes through [`live::LiveExecutor`];
//! tests drive the state machine with a scripted implementation.
//!
//! Responses are normalized to [`OrderAck`] so the strategy never sees a
//! venue-specific shape. The executor never retries internally: transport
//! failures are reported as retriable and the retry policy lives in the
//! state machine.

pub mod binance;
pub mod hyperliquid;
pub mod live;
pub mod precision;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arb_common::{Side, Venue};

pub use precision::SymbolFilters;

/// Errors from order placement or cancellation.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Network failure, timeout, or 5xx. Safe to retry.
    #[error("transport error on {venue}: {msg}")]
    Transport { venue: Venue, msg: String },

    /// Venue-level reject (precision, balance, risk). Not retried.
    #[error("{venue} rejected order: {msg}")]
    Rejected { venue: Venue, msg: String },

    /// Response arrived but could not be understood.
    #[error("unparseable {venue} response: {msg}")]
    BadResponse { venue: Venue, msg: String },

    /// Request was malformed before it left the process.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ExecutorError {
    /// Whether the caller may retry the same request.
    pub fn retriable(&self) -> bool {
        matches!(self, ExecutorError::Transport { .. })
    }

    /// Whether a venue reject points at price/size precision filters,
    /// i.e. our cached tick/lot metadata has gone stale.
    pub fn is_filter_reject(&self) -> bool {
        let ExecutorError::Rejected { msg, .. } = self else {
            return false;
        };
        let msg = msg.to_lowercase();
        msg.contains("filter")
            || msg.contains("precision")
            || msg.contains("tick size")
            || msg.contains("lot size")
            || msg.contains("invalid size")
            || msg.contains("divisible")
            || msg.contains("-1111")
            || msg.contains("-1013")
    }
}

/// Normalized order status across venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// Normalized acknowledgement for a placement, cancel, or status query.
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: String,
    pub client_id: Option<String>,
    pub status: OrderStatus,
    pub filled_qty: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub ts: DateTime<Utc>,
}

/// Request to place an order.
///
/// Limit when `price` is set, market otherwise. `quote_amount` is a
/// market-by-notional convenience (spend this much quote currency).
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub venue: Venue,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub quote_amount: Option<Decimal>,
    /// Deterministic client order id, unique per cycle/leg/attempt.
    pub client_id: String,
}

impl PlaceOrder {
    pub fn limit(
        venue: Venue,
        symbol: impl Into<String>,
        side: Side,
        qty: Decimal,
        price: Decimal,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            side,
            qty,
            price: Some(price),
            quote_amount: None,
            client_id: client_id.into(),
        }
    }

    pub fn market(
        venue: Venue,
        symbol: impl Into<String>,
        side: Side,
        qty: Decimal,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            side,
            qty,
            price: None,
            quote_amount: None,
            client_id: client_id.into(),
        }
    }

    pub fn is_limit(&self) -> bool {
        self.price.is_some()
    }
}

/// Request to cancel an order.
///
/// `symbol` is required for the CEX; the DEX takes a batch of order ids.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub venue: Venue,
    pub symbol: Option<String>,
    pub order_id: Option<String>,
    pub client_id: Option<String>,
    pub order_ids: Vec<String>,
}

impl CancelOrder {
    /// Cancel a single order on either venue.
    pub fn single(venue: Venue, symbol: impl Into<String>, order_id: impl Into<String>) -> Self {
        let order_id = order_id.into();
        Self {
            venue,
            symbol: Some(symbol.into()),
            order_id: Some(order_id.clone()),
            client_id: None,
            order_ids: vec![order_id],
        }
    }
}

/// Uniform place/cancel/query over both venues.
#[async_trait]
pub trait VenueExecutor: Send + Sync {
    /// Place an order. The ack carries the venue order id; fills arrive
    /// over the user stream.
    async fn place_order(&self, req: PlaceOrder) -> Result<OrderAck, ExecutorError>;

    /// Cancel an order. Losing the race to a fill is not an error here;
    /// the user stream settles which event was terminal.
    async fn cancel_order(&self, req: CancelOrder) -> Result<OrderAck, ExecutorError>;

    /// Query the current status of an order (post-reconnect follow-up).
    async fn query_order(
        &self,
        venue: Venue,
        symbol: &str,
        order_id: &str,
    ) -> Result<OrderAck, ExecutorError>;

    /// Current tick/lot filters for a venue symbol, fetched fresh from
    /// the venue. Called at startup and again whenever a placement is
    /// rejected on a precision filter.
    async fn symbol_filters(
        &self,
        venue: Venue,
        symbol: &str,
    ) -> Result<SymbolFilters, ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_retriable_split() {
        let transport = ExecutorError::Transport {
            venue: Venue::Binance,
            msg: "503".to_string(),
        };
        assert!(transport.retriable());

        let reject = ExecutorError::Rejected {
            venue: Venue::Hyperliquid,
            msg: "insufficient margin".to_string(),
        };
        assert!(!reject.retriable());
        assert!(!ExecutorError::InvalidRequest("no symbol".to_string()).retriable());
    }

    #[test]
    fn test_filter_reject_detection() {
        let err = ExecutorError::Rejected {
            venue: Venue::Binance,
            msg: "code -1013: Filter failure: LOT_SIZE".to_string(),
        };
        assert!(err.is_filter_reject());

        let err = ExecutorError::Rejected {
            venue: Venue::Hyperliquid,
            msg: "Price must be divisible by tick size.".to_string(),
        };
        assert!(err.is_filter_reject());

        let err = ExecutorError::Rejected {
            venue: Venue::Binance,
            msg: "Account has insufficient balance".to_string(),
        };
        assert!(!err.is_filter_reject());

        // Only venue rejects count; a transport error mentioning
        // filters is still a transport error.
        let err = ExecutorError::Transport {
            venue: Venue::Binance,
            msg: "filter".to_string(),
        };
        assert!(!err.is_filter_reject());
    }

    #[test]
    fn test_place_order_builders() {
        let limit = PlaceOrder::limit(
            Venue::Hyperliquid,
            "BTC",
            Side::Buy,
            dec!(0.001),
            dec!(30020),
            "arb-1-l1-a1",
        );
        assert!(limit.is_limit());
        assert_eq!(limit.price, Some(dec!(30020)));

        let market = PlaceOrder::market(Venue::Binance, "BTCUSDT", Side::Sell, dec!(0.001), "arb-1-l2-a4");
        assert!(!market.is_limit());
        assert!(market.quote_amount.is_none());
    }

    #[test]
    fn test_cancel_single_carries_batch_form() {
        let cancel = CancelOrder::single(Venue::Hyperliquid, "BTC", "774411");
        assert_eq!(cancel.order_id.as_deref(), Some("774411"));
        assert_eq!(cancel.order_ids, vec!["774411".to_string()]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OrderStatus::PartiallyFilled.to_string(), "PARTIALLY_FILLED");
        assert_eq!(OrderStatus::Filled.to_string(), "FILLED");
    }
}
