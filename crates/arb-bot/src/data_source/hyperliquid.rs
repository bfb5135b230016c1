//! Hyperliquid combined stream.
//!
//! One socket carries both subscriptions: the `l2Book` feed for the
//! configured coin and the wallet-keyed `orderUpdates` user feed. Book
//! updates land on the price board silently (no signal check — the CEX
//! tick is the sampling clock); order updates are normalized by the
//! user-stream adapter and forwarded to the strategy.
//!
//! The venue expects an application-level ping every minute; we send
//! one every 50 seconds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use arb_common::{L2Book, Level, Venue};

use crate::board::PriceBoard;
use crate::data_source::{
    StreamError, CONNECT_TIMEOUT, INITIAL_RECONNECT_DELAY, MAX_RECONNECT_DELAY,
};
use crate::executor::VenueExecutor;
use crate::strategy::StrategyHandle;
use crate::user_stream::hyperliquid::parse_order_updates;

const APP_PING_INTERVAL: Duration = Duration::from_secs(50);
const BOOK_DEPTH: usize = 10;

#[derive(Debug, Deserialize)]
struct ChannelMessage {
    channel: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct L2BookData {
    coin: String,
    #[serde(default)]
    time: Option<i64>,
    /// `[bids, asks]`.
    levels: Vec<Vec<RawLevel>>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    px: Decimal,
    sz: Decimal,
    #[serde(default)]
    n: u32,
}

/// Combined market-data + user-stream task for the DEX leg.
pub struct HyperliquidStream {
    ws_url: String,
    coin: String,
    wallet: String,
}

impl HyperliquidStream {
    pub fn new(
        ws_url: impl Into<String>,
        coin: impl Into<String>,
        wallet: impl Into<String>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            coin: coin.into(),
            wallet: wallet.into(),
        }
    }

    /// Run with automatic reconnection until shutdown.
    pub async fn run<E: VenueExecutor>(
        &self,
        board: Arc<PriceBoard>,
        strategy: StrategyHandle<E>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut delay = INITIAL_RECONNECT_DELAY;
        loop {
            if shutdown.try_recv().is_ok() {
                return;
            }
            match self.run_connection(&board, &strategy, &mut shutdown).await {
                Ok(()) => {
                    info!("Hyperliquid stream: clean shutdown");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Hyperliquid stream error, reconnecting in {:?}", delay);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => return,
                    }
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    }

    async fn run_connection<E: VenueExecutor>(
        &self,
        board: &PriceBoard,
        strategy: &StrategyHandle<E>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), StreamError> {
        info!(url = %self.ws_url, "connecting to Hyperliquid");
        let (ws_stream, _) = match timeout(CONNECT_TIMEOUT, connect_async(self.ws_url.as_str())).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => return Err(StreamError::Connection(e.to_string())),
            Err(_) => return Err(StreamError::Timeout),
        };
        let (mut write, mut read) = ws_stream.split();

        // Both subscriptions ride the same socket.
        let book_sub = json!({
            "method": "subscribe",
            "subscription": {"type": "l2Book", "coin": self.coin}
        });
        write
            .send(Message::Text(book_sub.to_string().into()))
            .await?;
        let user_sub = json!({
            "method": "subscribe",
            "subscription": {"type": "orderUpdates", "user": self.wallet}
        });
        write
            .send(Message::Text(user_sub.to_string().into()))
            .await?;
        info!(coin = %self.coin, "Hyperliquid subscriptions sent");

        // The user feed rides this socket; follow up any in-flight
        // order that terminated while we were disconnected.
        strategy.resync_inflight(Venue::Hyperliquid).await;

        let mut ping_timer = interval(APP_PING_INTERVAL);
        ping_timer.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.dispatch(&text, board, strategy).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "Hyperliquid stream closed by server");
                            return Err(StreamError::StreamEnded);
                        }
                        Some(Err(e)) => return Err(StreamError::WebSocket(e)),
                        None => return Err(StreamError::StreamEnded),
                        _ => {}
                    }
                }
                _ = ping_timer.tick() => {
                    let ping = json!({"method": "ping"});
                    write.send(Message::Text(ping.to_string().into())).await?;
                }
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }

    async fn dispatch<E: VenueExecutor>(
        &self,
        text: &str,
        board: &PriceBoard,
        strategy: &StrategyHandle<E>,
    ) {
        let msg: ChannelMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(_) => {
                // Connection banner and other non-JSON frames.
                debug!(frame = text, "non-channel Hyperliquid frame");
                return;
            }
        };
        match msg.channel.as_str() {
            "l2Book" => {
                if let Some(book) = parse_l2_book(&msg.data, BOOK_DEPTH) {
                    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                        // Silent: no downstream signal on DEX ticks.
                        if let Err(e) = board.update(Venue::Hyperliquid, bid, ask) {
                            debug!(error = %e, "rejected Hyperliquid quote");
                        }
                    }
                }
            }
            "orderUpdates" => {
                for event in parse_order_updates(&msg.data) {
                    strategy.on_order_event(event).await;
                }
            }
            "subscriptionResponse" | "pong" => {}
            other => debug!(channel = other, "unhandled Hyperliquid channel"),
        }
    }
}

/// Parse an `l2Book` payload into a book snapshot.
pub fn parse_l2_book(data: &serde_json::Value, depth: usize) -> Option<L2Book> {
    let parsed: L2BookData = match serde_json::from_value(data.clone()) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "unparseable l2Book payload");
            return None;
        }
    };
    let mut sides = parsed.levels.into_iter();
    let bids_raw = sides.next().unwrap_or_default();
    let asks_raw = sides.next().unwrap_or_default();

    let to_levels = |raw: Vec<RawLevel>| -> Vec<Level> {
        raw.into_iter()
            .take(depth)
            .filter(|l| l.sz > Decimal::ZERO)
            .map(|l| Level::new(l.px, l.sz, l.n))
            .collect()
    };

    let ts = parsed
        .time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    Some(L2Book::new(
        Venue::Hyperliquid,
        parsed.coin,
        to_levels(bids_raw),
        to_levels(asks_raw),
        0,
        ts,
    ))
}
