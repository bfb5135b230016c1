//! Binance futures depth stream.
//!
//! Subscribes to the partial-depth stream for one symbol and treats each
//! push as a full top-N snapshot. Every successfully applied update
//! triggers a strategy signal check (the CEX is the sampling clock).

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use arb_common::{L2Book, Level, Venue};

use crate::board::PriceBoard;
use crate::data_source::{
    StreamError, CONNECT_TIMEOUT, INITIAL_RECONNECT_DELAY, MAX_RECONNECT_DELAY,
};
use crate::executor::VenueExecutor;
use crate::strategy::StrategyHandle;

/// Depth levels to keep from each push.
const BOOK_DEPTH: usize = 10;

/// One depth message. The partial stream pushes `bids`/`asks`; the diff
/// stream pushes `b`/`a` with the same layout.
#[derive(Debug, Deserialize)]
struct DepthMessage {
    #[serde(rename = "e", default)]
    _event_type: Option<String>,
    #[serde(rename = "s", default)]
    symbol: Option<String>,
    #[serde(rename = "E", default)]
    event_time: Option<i64>,
    #[serde(rename = "u", default)]
    update_id: Option<u64>,
    #[serde(default, alias = "b")]
    bids: Vec<(Decimal, Decimal)>,
    #[serde(default, alias = "a")]
    asks: Vec<(Decimal, Decimal)>,
}

/// Market-data task for the CEX leg.
pub struct BinanceMarketStream {
    ws_url: String,
    symbol: String,
}

impl BinanceMarketStream {
    pub fn new(ws_url: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            symbol: symbol.into(),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/ws/{}@depth{}@100ms",
            self.ws_url.trim_end_matches('/'),
            self.symbol.to_lowercase(),
            BOOK_DEPTH
        )
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
                    info!("Binance market stream: clean shutdown");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Binance market stream error, reconnecting in {:?}", delay);
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
        let url = self.stream_url();
        info!(%url, "connecting to Binance depth stream");
        let (ws_stream, _) = match timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => return Err(StreamError::Connection(e.to_string())),
            Err(_) => return Err(StreamError::Timeout),
        };
        info!("Binance depth stream connected");

        let (mut write, mut read) = ws_stream.split();
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(book) = parse_depth(&text, &self.symbol, BOOK_DEPTH) {
                                self.apply(board, strategy, &book).await;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "Binance depth stream closed by server");
                            return Err(StreamError::StreamEnded);
                        }
                        Some(Err(e)) => return Err(StreamError::WebSocket(e)),
                        None => return Err(StreamError::StreamEnded),
                        _ => {}
                    }
                }
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }

    async fn apply<E: VenueExecutor>(
        &self,
        board: &PriceBoard,
        strategy: &StrategyHandle<E>,
        book: &L2Book,
    ) {
        let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) else {
            return;
        };
        if let Err(e) = board.update(Venue::Binance, bid, ask) {
            debug!(error = %e, "rejected Binance quote");
            return;
        }
        // The CEX tick is the sampling clock: check the signal now.
        strategy.on_signal_tick().await;
    }
}

/// Parse one depth push into a book snapshot.
///
/// Zero-size levels are dropped and sides are resorted; the venue does
/// not report per-level order counts.
pub fn parse_depth(text: &str, symbol: &str, depth: usize) -> Option<L2Book> {
    // Subscription confirmations and other control frames.
    if text.contains("\"result\"") {
        return None;
    }
    let msg: DepthMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "unparseable depth message");
            return None;
        }
    };
    if msg.bids.is_empty() && msg.asks.is_empty() {
        return None;
    }

    let to_levels = |raw: &[(Decimal, Decimal)]| -> Vec<Level> {
        raw.iter()
            .take(depth)
            .filter(|(_, size)| *size > Decimal::ZERO)
            .map(|(price, size)| Level::new(*price, *size, 1))
            .collect()
    };
    let mut bids = to_levels(&msg.bids);
    let mut asks = to_levels(&msg.asks);
    bids.sort_by(|a, b| b.price.cmp(&a.price));
    asks.sort_by(|a, b| a.price.cmp(&b.price));

    let ts = msg
        .event_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    Some(L2Book::new(
        Venue::Binance,
        msg.symbol.unwrap_or_else(|| symbol.to_string()),
        bids,
        asks,
        msg.update_id.unwrap_or(0),
        ts,
    ))
}
