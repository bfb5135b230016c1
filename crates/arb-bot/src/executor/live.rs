//! Live executor routing normalized requests to the venue clients.

use async_trait::async_trait;
use tracing::info;

use arb_common::Venue;

use crate::executor::binance::BinanceClient;
use crate::executor::hyperliquid::HyperliquidClient;
use crate::executor::{
    CancelOrder, ExecutorError, OrderAck, PlaceOrder, SymbolFilters, VenueExecutor,
};

/// Routes `VenueExecutor` calls to the Binance or Hyperliquid client.
pub struct LiveExecutor {
    binance: BinanceClient,
    hyperliquid: HyperliquidClient,
}

impl LiveExecutor {
    pub fn new(binance: BinanceClient, hyperliquid: HyperliquidClient) -> Self {
        Self {
            binance,
            hyperliquid,
        }
    }

    pub fn binance(&self) -> &BinanceClient {
        &self.binance
    }

    pub fn hyperliquid(&self) -> &HyperliquidClient {
        &self.hyperliquid
    }
}

#[async_trait]
impl VenueExecutor for LiveExecutor {
    async fn place_order(&self, req: PlaceOrder) -> Result<OrderAck, ExecutorError> {
        info!(
            venue = %req.venue,
            symbol = %req.symbol,
            side = %req.side,
            qty = %req.qty,
            price = ?req.price,
            client_id = %req.client_id,
            "placing order"
        );
        match req.venue {
            Venue::Binance => {
                self.binance
                    .place_order(
                        &req.symbol,
                        req.side,
                        req.qty,
                        req.price,
                        req.quote_amount,
                        &req.client_id,
                    )
                    .await
            }
            Venue::Hyperliquid => {
                self.hyperliquid
                    .place_order(req.side, req.qty, req.price, &req.client_id)
                    .await
            }
        }
    }

    async fn cancel_order(&self, req: CancelOrder) -> Result<OrderAck, ExecutorError> {
        info!(venue = %req.venue, order_id = ?req.order_id, "canceling order");
        match req.venue {
            Venue::Binance => {
                let symbol = req.symbol.as_deref().ok_or_else(|| {
                    ExecutorError::InvalidRequest("Binance cancel needs a symbol".to_string())
                })?;
                self.binance
                    .cancel_order(symbol, req.order_id.as_deref(), req.client_id.as_deref())
                    .await
            }
            Venue::Hyperliquid => {
                if req.order_ids.is_empty() {
                    return Err(ExecutorError::InvalidRequest(
                        "Hyperliquid cancel needs order_ids".to_string(),
                    ));
                }
                self.hyperliquid.cancel_orders(&req.order_ids).await
            }
        }
    }

    async fn query_order(
        &self,
        venue: Venue,
        symbol: &str,
        order_id: &str,
    ) -> Result<OrderAck, ExecutorError> {
        match venue {
            Venue::Binance => self.binance.query_order(symbol, order_id).await,
            Venue::Hyperliquid => self.hyperliquid.query_order(order_id).await,
        }
    }

    async fn symbol_filters(
        &self,
        venue: Venue,
        symbol: &str,
    ) -> Result<SymbolFilters, ExecutorError> {
        match venue {
            Venue::Binance => self.binance.symbol_filters(symbol).await,
            Venue::Hyperliquid => self.hyperliquid.fetch_filters().await,
        }
    }
}
