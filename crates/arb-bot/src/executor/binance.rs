//! Binance USD-M futures REST client.
//!
//! Covers the slice of the API the executor needs: signed order
//! placement/cancellation/query, account balances and positions for the
//! startup reconciler, exchange filters, and listen-key lifecycle for the
//! user stream.
//!
//! Every signed request carries `timestamp` and `recvWindow` and an
//! HMAC-SHA256 signature of the query string appended as `signature`.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use arb_common::{Side, Venue};

use crate::config::VenueConfig;
use crate::executor::{ExecutorError, OrderAck, OrderStatus, SymbolFilters};

const RECV_WINDOW_MS: u64 = 5_000;
const HTTP_TIMEOUT_SECS: u64 = 5;

type HmacSha256 = Hmac<Sha256>;

/// Order placement/cancel response shape shared by the order endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(default)]
    orig_client_order_id: Option<String>,
    status: String,
    #[serde(default)]
    executed_qty: Option<Decimal>,
    #[serde(default)]
    avg_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    listen_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRisk {
    symbol: String,
    position_amt: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetBalance {
    asset: String,
    available_balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum RawFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    Lot {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

/// REST client for the CEX leg.
pub struct BinanceClient {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
    secret: String,
}

impl BinanceClient {
    pub fn new(venues: &VenueConfig) -> Result<Self, ExecutorError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| transport(e.to_string()))?;
        Ok(Self {
            http,
            rest_url: venues.cex_rest_url.trim_end_matches('/').to_string(),
            api_key: venues.cex_api_key.clone(),
            secret: venues.cex_secret.clone(),
        })
    }

    /// Sign a query string with the account secret.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_query(&self, mut params: Vec<(String, String)>) -> String {
        params.push(("timestamp".to_string(), Utc::now().timestamp_millis().to_string()));
        params.push(("recvWindow".to_string(), RECV_WINDOW_MS.to_string()));
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&query);
        format!("{}&signature={}", query, signature)
    }

    async fn send_signed(
        &self,
        method: reqwest::Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<String, ExecutorError> {
        let url = format!("{}{}?{}", self.rest_url, path, self.signed_query(params));
        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(transport(format!("HTTP {}: {}", status, body)));
        }
        // 4xx: a venue-level reject carrying {code, msg}.
        let msg = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) => format!("code {}: {}", err.code, err.msg),
            Err(_) => body,
        };
        Err(ExecutorError::Rejected {
            venue: Venue::Binance,
            msg,
        })
    }

    /// Place a limit (GTC) or market order.
    pub async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
        price: Option<Decimal>,
        quote_amount: Option<Decimal>,
        client_id: &str,
    ) -> Result<OrderAck, ExecutorError> {
        let mut params = vec![
            ("symbol".to_string(), symbol.to_uppercase()),
            ("side".to_string(), side.as_str().to_string()),
            ("newClientOrderId".to_string(), client_id.to_string()),
        ];
        match price {
            Some(price) => {
                params.push(("type".to_string(), "LIMIT".to_string()));
                params.push(("timeInForce".to_string(), "GTC".to_string()));
                params.push(("quantity".to_string(), qty.normalize().to_string()));
                params.push(("price".to_string(), price.normalize().to_string()));
            }
            None => {
                params.push(("type".to_string(), "MARKET".to_string()));
                match quote_amount {
                    Some(notional) => params.push((
                        "quoteOrderQty".to_string(),
                        notional.round_dp(2).normalize().to_string(),
                    )),
                    None => params.push(("quantity".to_string(), qty.normalize().to_string())),
                }
            }
        }

        let body = self
            .send_signed(reqwest::Method::POST, "/fapi/v1/order", params)
            .await?;
        parse_order_response(&body)
    }

    /// Cancel by order id or client order id.
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<OrderAck, ExecutorError> {
        let mut params = vec![("symbol".to_string(), symbol.to_uppercase())];
        match (order_id, client_id) {
            (Some(id), _) => params.push(("orderId".to_string(), id.to_string())),
            (None, Some(cid)) => params.push(("origClientOrderId".to_string(), cid.to_string())),
            (None, None) => {
                return Err(ExecutorError::InvalidRequest(
                    "Binance cancel needs order_id or client_id".to_string(),
                ))
            }
        }
        let body = self
            .send_signed(reqwest::Method::DELETE, "/fapi/v1/order", params)
            .await?;
        parse_order_response(&body)
    }

    /// Query the current status of an order.
    pub async fn query_order(&self, symbol: &str, order_id: &str) -> Result<OrderAck, ExecutorError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_uppercase()),
            ("orderId".to_string(), order_id.to_string()),
        ];
        let body = self
            .send_signed(reqwest::Method::GET, "/fapi/v1/order", params)
            .await?;
        parse_order_response(&body)
    }

    /// Signed position amount for one symbol (positive long, negative short).
    pub async fn position_amt(&self, symbol: &str) -> Result<Decimal, ExecutorError> {
        let params = vec![("symbol".to_string(), symbol.to_uppercase())];
        let body = self
            .send_signed(reqwest::Method::GET, "/fapi/v2/positionRisk", params)
            .await?;
        let positions: Vec<PositionRisk> =
            serde_json::from_str(&body).map_err(|e| bad_response(e.to_string()))?;
        Ok(positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
            .map(|p| p.position_amt)
            .unwrap_or(Decimal::ZERO))
    }

    /// Available USDT balance on the futures account.
    pub async fn usdt_balance(&self) -> Result<Decimal, ExecutorError> {
        let body = self
            .send_signed(reqwest::Method::GET, "/fapi/v2/balance", Vec::new())
            .await?;
        let balances: Vec<AssetBalance> =
            serde_json::from_str(&body).map_err(|e| bad_response(e.to_string()))?;
        Ok(balances
            .iter()
            .find(|b| b.asset == "USDT")
            .map(|b| b.available_balance)
            .unwrap_or(Decimal::ZERO))
    }

    /// Fetch tick/lot filters for a symbol from exchangeInfo.
    pub async fn symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, ExecutorError> {
        let url = format!("{}/fapi/v1/exchangeInfo?symbol={}", self.rest_url, symbol.to_uppercase());
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?
            .text()
            .await
            .map_err(|e| transport(e.to_string()))?;
        let info: ExchangeInfo =
            serde_json::from_str(&body).map_err(|e| bad_response(e.to_string()))?;
        let symbol_info = info
            .symbols
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| bad_response(format!("symbol {} missing from exchangeInfo", symbol)))?;

        let mut tick_size = None;
        let mut step_size = None;
        for filter in &symbol_info.filters {
            match filter {
                RawFilter::Price { tick_size: t } => tick_size = Some(*t),
                RawFilter::Lot { step_size: s } => step_size = Some(*s),
                RawFilter::Other => {}
            }
        }
        match (tick_size, step_size) {
            (Some(tick), Some(step)) => {
                debug!(%symbol, %tick, %step, "loaded Binance symbol filters");
                Ok(SymbolFilters::new(tick, step))
            }
            _ => Err(bad_response(format!("incomplete filters for {}", symbol))),
        }
    }

    /// Obtain a fresh user-stream listen key.
    pub async fn create_listen_key(&self) -> Result<String, ExecutorError> {
        let body = self
            .listen_key_request(reqwest::Method::POST)
            .await?;
        let parsed: ListenKeyResponse =
            serde_json::from_str(&body).map_err(|e| bad_response(e.to_string()))?;
        Ok(parsed.listen_key)
    }

    /// Extend the listen key's validity (call every 30 minutes).
    pub async fn keepalive_listen_key(&self) -> Result<(), ExecutorError> {
        self.listen_key_request(reqwest::Method::PUT).await.map(|_| ())
    }

    /// Discard the listen key on shutdown.
    pub async fn close_listen_key(&self) -> Result<(), ExecutorError> {
        self.listen_key_request(reqwest::Method::DELETE).await.map(|_| ())
    }

    async fn listen_key_request(&self, method: reqwest::Method) -> Result<String, ExecutorError> {
        let url = format!("{}/fapi/v1/listenKey", self.rest_url);
        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport(e.to_string()))?;
        if !status.is_success() {
            warn!(%status, %body, "listen key request failed");
            return Err(transport(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }
}

fn transport(msg: String) -> ExecutorError {
    ExecutorError::Transport {
        venue: Venue::Binance,
        msg,
    }
}

fn bad_response(msg: String) -> ExecutorError {
    ExecutorError::BadResponse {
        venue: Venue::Binance,
        msg,
    }
}

fn parse_order_response(body: &str) -> Result<OrderAck, ExecutorError> {
    let parsed: OrderResponse =
        serde_json::from_str(body).map_err(|e| bad_response(format!("{}: {}", e, body)))?;
    Ok(OrderAck {
        order_id: parsed.order_id.to_string(),
        client_id: parsed.client_order_id.or(parsed.orig_client_order_id),
        status: parse_status(&parsed.status),
        filled_qty: parsed.executed_qty,
        avg_price: parsed.avg_price,
        ts: Utc::now(),
    })
}

fn parse_status(raw: &str) -> OrderStatus {
    match raw {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" | "EXPIRED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        other => {
            warn!(status = other, "unknown Binance order status");
            OrderStatus::Rejected
        }
    }
}
