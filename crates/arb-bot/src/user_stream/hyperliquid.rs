//! Hyperliquid order-update normalization.
//!
//! `orderUpdates` delivers a batch of `{order, status, statusTimestamp}`
//! entries. Fill quantities (`cumSz`) are cumulative. A `filled` status
//! only counts as terminal once the cumulative size reaches the order
//! size; the venue may push intermediate partial states that the
//! strategy must not treat as terminal.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use arb_common::Venue;

use crate::strategy::{OrderEvent, OrderEventKind};

#[derive(Debug, Deserialize)]
struct OrderUpdate {
    order: OrderBody,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody {
    #[serde(default)]
    oid: Option<u64>,
    #[serde(default)]
    cloid: Option<String>,
    #[serde(default)]
    sz: Option<Decimal>,
    #[serde(default)]
    orig_sz: Option<Decimal>,
    #[serde(default)]
    cum_sz: Option<Decimal>,
}

/// Normalize an `orderUpdates` payload into terminal events.
///
/// Non-terminal states (`open`, intermediate fills) produce nothing.
pub fn parse_order_updates(data: &Value) -> Vec<OrderEvent> {
    let updates: Vec<OrderUpdate> = match serde_json::from_value(data.clone()) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "unparseable orderUpdates payload");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    for update in updates {
        let order_id = match (&update.order.oid, &update.order.cloid) {
            (Some(oid), _) => oid.to_string(),
            (None, Some(cloid)) => cloid.clone(),
            (None, None) => {
                warn!("order update without oid or cloid, dropped");
                continue;
            }
        };
        let cum_sz = update.order.cum_sz.unwrap_or(Decimal::ZERO);
        // `sz` is the remaining size on this venue; the original order
        // size arrives as `origSz`.
        let total_sz = update.order.orig_sz.or(update.order.sz).unwrap_or(Decimal::ZERO);

        match update.status.as_str() {
            "filled" => {
                if total_sz.is_zero() || cum_sz >= total_sz {
                    events.push(OrderEvent::all_traded(
                        Venue::Hyperliquid,
                        order_id,
                        cum_sz,
                    ));
                } else {
                    debug!(%order_id, %cum_sz, %total_sz, "partial fill, not yet terminal");
                }
            }
            "canceled" | "cancelled" | "marginCanceled" => {
                if cum_sz > Decimal::ZERO {
                    events.push(OrderEvent::partial_filled_canceled(
                        Venue::Hyperliquid,
                        order_id,
                        cum_sz,
                    ));
                } else {
                    events.push(OrderEvent::all_canceled(Venue::Hyperliquid, order_id));
                }
            }
            "rejected" | "expired" => {
                events.push(OrderEvent::all_canceled(Venue::Hyperliquid, order_id));
            }
            "open" => {}
            other => debug!(status = other, %order_id, "unhandled order status"),
        }
    }
    events
}
