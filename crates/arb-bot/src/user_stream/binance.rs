//! Binance user stream over a listen-key socket.
//!
//! The listen key is obtained via REST and refreshed every 30 minutes;
//! a failed refresh tears the stream down and the run loop restarts it
//! with a fresh key. `ORDER_TRADE_UPDATE` events carry cumulative fill
//! quantities in `o.z`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use arb_common::Venue;

use crate::data_source::{
    StreamError, CONNECT_TIMEOUT, INITIAL_RECONNECT_DELAY, MAX_RECONNECT_DELAY,
};
use crate::executor::binance::BinanceClient;
use crate::executor::VenueExecutor;
use crate::strategy::{OrderEvent, StrategyHandle};

/// Listen keys are valid for 60 minutes; refresh at half that.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Deserialize)]
struct UserEvent {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "o", default)]
    order: Option<OrderUpdate>,
    // Spot-style executionReport fields, flattened at the top level.
    #[serde(rename = "i", default)]
    order_id: Option<u64>,
    #[serde(rename = "X", default)]
    status: Option<String>,
    #[serde(rename = "z", default)]
    cum_filled: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct OrderUpdate {
    #[serde(rename = "i")]
    order_id: u64,
    #[serde(rename = "X")]
    status: String,
    #[serde(rename = "z", default)]
    cum_filled: Decimal,
    #[serde(rename = "c", default)]
    _client_order_id: Option<String>,
}

/// Normalize one user-stream message into a terminal event, if any.
///
/// Handles the futures `ORDER_TRADE_UPDATE` wrapper and the legacy
/// spot-style `executionReport` layout.
pub fn parse_user_event(text: &str) -> Option<OrderEvent> {
    let event: UserEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(_) => {
            debug!("non-order user-stream frame");
            return None;
        }
    };

    let (order_id, status, cum_filled) = match event.event_type.as_str() {
        "ORDER_TRADE_UPDATE" => {
            let order = event.order?;
            (order.order_id, order.status, order.cum_filled)
        }
        "executionReport" => (
            event.order_id?,
            event.status?,
            event.cum_filled.unwrap_or(Decimal::ZERO),
        ),
        other => {
            debug!(event_type = other, "ignoring user-stream event");
            return None;
        }
    };
    normalize(order_id, &status, cum_filled)
}

fn normalize(order_id: u64, status: &str, cum_filled: Decimal) -> Option<OrderEvent> {
    let order_id = order_id.to_string();
    match status {
        "FILLED" => Some(OrderEvent::all_traded(Venue::Binance, order_id, cum_filled)),
        "CANCELED" | "EXPIRED" => {
            if cum_filled > Decimal::ZERO {
                Some(OrderEvent::partial_filled_canceled(
                    Venue::Binance,
                    order_id,
                    cum_filled,
                ))
            } else {
                Some(OrderEvent::all_canceled(Venue::Binance, order_id))
            }
        }
        "REJECTED" => Some(OrderEvent::all_canceled(Venue::Binance, order_id)),
        // NEW / PARTIALLY_FILLED are not terminal.
        _ => None,
    }
}

/// User-stream task for the CEX leg.
pub struct BinanceUserStream {
    ws_url: String,
}

impl BinanceUserStream {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// Run with automatic restart (fresh listen key) until shutdown.
    pub async fn run<E: VenueExecutor>(
        &self,
        client: &BinanceClient,
        strategy: StrategyHandle<E>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut delay = INITIAL_RECONNECT_DELAY;
        loop {
            if shutdown.try_recv().is_ok() {
                return;
            }
            match self.run_session(client, &strategy, &mut shutdown).await {
                Ok(()) => {
                    let _ = client.close_listen_key().await;
                    info!("Binance user stream: clean shutdown");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Binance user stream error, restarting in {:?}", delay);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => return,
                    }
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    }

    /// One listen-key session: key, socket, keepalive loop.
    async fn run_session<E: VenueExecutor>(
        &self,
        client: &BinanceClient,
        strategy: &StrategyHandle<E>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), StreamError> {
        let listen_key = client
            .create_listen_key()
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;
        info!("Binance listen key obtained");

        let url = format!("{}/ws/{}", self.ws_url.trim_end_matches('/'), listen_key);
        let (ws_stream, _) = match timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => return Err(StreamError::Connection(e.to_string())),
            Err(_) => return Err(StreamError::Timeout),
        };
        info!("Binance user stream connected");

        // Anything that terminated while we were down never replays.
        strategy.resync_inflight(Venue::Binance).await;

        let (mut write, mut read) = ws_stream.split();
        let mut keepalive = interval(KEEPALIVE_INTERVAL);
        keepalive.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_user_event(&text) {
                                strategy.on_order_event(event).await;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "Binance user stream closed by server");
                            return Err(StreamError::StreamEnded);
                        }
                        Some(Err(e)) => return Err(StreamError::WebSocket(e)),
                        None => return Err(StreamError::StreamEnded),
                        _ => {}
                    }
                }
                _ = keepalive.tick() => {
                    if let Err(e) = client.keepalive_listen_key().await {
                        // Restart the session with a fresh key.
                        warn!(error = %e, "listen key refresh failed");
                        return Err(StreamError::Connection(e.to_string()));
                    }
                    debug!("listen key refreshed");
                }
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }
}
