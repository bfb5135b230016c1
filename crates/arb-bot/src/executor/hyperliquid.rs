//! Hyperliquid exchange client.
//!
//! Actions (orders, cancels) are posted to `/exchange` as
//! `{action, nonce, signature}` where the signature is produced by the
//! local wallet signer over the keccak hash of the serialized action and
//! nonce. Account and market metadata come from `/info`.
//!
//! Asset ids and size decimals are resolved once from `meta` at
//! connect time; orders reference the asset by index, not by name.

use alloy::primitives::{keccak256, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, warn};

use arb_common::{Side, Venue};

use crate::config::VenueConfig;
use crate::executor::{ExecutorError, OrderAck, OrderStatus, SymbolFilters};

const HTTP_TIMEOUT_SECS: u64 = 5;
/// Allowed slippage for market orders, mirrors the venue SDK default.
const MARKET_SLIPPAGE: &str = "0.02";
/// Perp prices allow at most `6 - szDecimals` decimal places.
const PX_DECIMALS_BUDGET: u32 = 6;

/// REST client for the DEX leg.
pub struct HyperliquidClient {
    http: reqwest::Client,
    rest_url: String,
    wallet: String,
    signer: PrivateKeySigner,
    coin: String,
    asset_id: u32,
    filters: SymbolFilters,
}

impl HyperliquidClient {
    /// Build the client and resolve asset metadata for the configured coin.
    pub async fn connect(venues: &VenueConfig) -> Result<Self, ExecutorError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| transport(e.to_string()))?;
        let signer: PrivateKeySigner = venues
            .dex_private_key
            .parse()
            .map_err(|e| ExecutorError::InvalidRequest(format!("bad dex private key: {}", e)))?;

        let rest_url = venues.dex_rest_url.trim_end_matches('/').to_string();
        let meta = info_request(&http, &rest_url, json!({"type": "meta"})).await?;
        let (asset_id, filters) = resolve_asset(&meta, &venues.dex_symbol)?;
        debug!(coin = %venues.dex_symbol, asset_id, "resolved Hyperliquid asset");

        Ok(Self {
            http,
            rest_url,
            wallet: venues.dex_wallet.clone(),
            signer,
            coin: venues.dex_symbol.clone(),
            asset_id,
            filters,
        })
    }

    /// Tick/lot filters resolved from `meta` at connect time.
    pub fn filters(&self) -> SymbolFilters {
        self.filters
    }

    /// Re-resolve tick/lot filters from `meta`, after a reject that
    /// suggests the cached values went stale.
    pub async fn fetch_filters(&self) -> Result<SymbolFilters, ExecutorError> {
        let meta = info_request(&self.http, &self.rest_url, json!({"type": "meta"})).await?;
        let (_, filters) = resolve_asset(&meta, &self.coin)?;
        Ok(filters)
    }

    /// Place a limit (GTC) or market order.
    pub async fn place_order(
        &self,
        side: Side,
        qty: Decimal,
        price: Option<Decimal>,
        client_id: &str,
    ) -> Result<OrderAck, ExecutorError> {
        let order_type = match price {
            Some(_) => json!({"limit": {"tif": "Gtc"}}),
            None => json!({"market": {"slippage": MARKET_SLIPPAGE}}),
        };
        let px = price.unwrap_or(Decimal::ZERO);
        let cloid = cloid_for(client_id);
        let action = json!({
            "type": "order",
            "orders": [{
                "a": self.asset_id,
                "b": side == Side::Buy,
                "p": px.normalize().to_string(),
                "s": qty.normalize().to_string(),
                "r": false,
                "t": order_type,
                "c": cloid,
            }],
            "grouping": "na",
        });
        let body = self.post_action(action).await?;
        parse_order_response(&body, client_id)
    }

    /// Cancel a batch of orders by venue order id.
    pub async fn cancel_orders(&self, order_ids: &[String]) -> Result<OrderAck, ExecutorError> {
        let cancels: Vec<Value> = order_ids
            .iter()
            .map(|oid| {
                let oid_num: u64 = oid.parse().unwrap_or(0);
                json!({"a": self.asset_id, "o": oid_num})
            })
            .collect();
        let action = json!({"type": "cancel", "cancels": cancels});
        let body = self.post_action(action).await?;
        parse_cancel_response(&body, order_ids)
    }

    /// Query one order's status.
    pub async fn query_order(&self, order_id: &str) -> Result<OrderAck, ExecutorError> {
        let oid: u64 = order_id
            .parse()
            .map_err(|_| ExecutorError::InvalidRequest(format!("bad oid {}", order_id)))?;
        let body = info_request(
            &self.http,
            &self.rest_url,
            json!({"type": "orderStatus", "user": self.wallet, "oid": oid}),
        )
        .await?;
        parse_order_status(&body, order_id)
    }

    /// Signed position size for the configured coin (positive long).
    pub async fn position_szi(&self) -> Result<Decimal, ExecutorError> {
        let state = self.user_state().await?;
        let positions = state
            .get("assetPositions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for entry in positions {
            let position = &entry["position"];
            if position["coin"].as_str() == Some(self.coin.as_str()) {
                return parse_decimal_field(position, "szi");
            }
        }
        Ok(Decimal::ZERO)
    }

    /// Withdrawable USDC balance.
    pub async fn usdc_balance(&self) -> Result<Decimal, ExecutorError> {
        let state = self.user_state().await?;
        parse_decimal_field(&state, "withdrawable")
    }

    async fn user_state(&self) -> Result<Value, ExecutorError> {
        info_request(
            &self.http,
            &self.rest_url,
            json!({"type": "clearinghouseState", "user": self.wallet}),
        )
        .await
    }

    async fn post_action(&self, action: Value) -> Result<Value, ExecutorError> {
        let nonce = Utc::now().timestamp_millis();
        let signature = self.sign_action(&action, nonce)?;
        let payload = json!({
            "action": action,
            "nonce": nonce,
            "signature": signature,
        });

        let response = self
            .http
            .post(format!("{}/exchange", self.rest_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport(e.to_string()))?;
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(transport(format!("HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(ExecutorError::Rejected {
                venue: Venue::Hyperliquid,
                msg: format!("HTTP {}: {}", status, body),
            });
        }
        serde_json::from_str(&body).map_err(|e| bad_response(format!("{}: {}", e, body)))
    }

    /// Sign the keccak hash of the serialized action and nonce.
    fn sign_action(&self, action: &Value, nonce: i64) -> Result<Value, ExecutorError> {
        let serialized = serde_json::to_string(action)
            .map_err(|e| ExecutorError::InvalidRequest(e.to_string()))?;
        let digest: B256 = keccak256(format!("{}{}", serialized, nonce).as_bytes());
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| ExecutorError::InvalidRequest(format!("signing failed: {}", e)))?;
        let bytes = signature.as_bytes();
        let v = bytes[64] as u64;
        Ok(json!({
            "r": format!("0x{}", hex::encode(&bytes[..32])),
            "s": format!("0x{}", hex::encode(&bytes[32..64])),
            "v": if v < 27 { v + 27 } else { v },
        }))
    }
}

async fn info_request(
    http: &reqwest::Client,
    rest_url: &str,
    body: Value,
) -> Result<Value, ExecutorError> {
    let response = http
        .post(format!("{}/info", rest_url))
        .json(&body)
        .send()
        .await
        .map_err(|e| transport(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport(e.to_string()))?;
    if !status.is_success() {
        return Err(transport(format!("HTTP {}: {}", status, text)));
    }
    serde_json::from_str(&text).map_err(|e| bad_response(format!("{}: {}", e, text)))
}

/// Resolve asset index and size/price increments from `meta`.
fn resolve_asset(meta: &Value, coin: &str) -> Result<(u32, SymbolFilters), ExecutorError> {
    let universe = meta
        .get("universe")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_response("meta response missing universe".to_string()))?;
    for (index, entry) in universe.iter().enumerate() {
        if entry["name"].as_str() == Some(coin) {
            let sz_decimals = entry["szDecimals"].as_u64().unwrap_or(0) as u32;
            let step_size = Decimal::new(1, sz_decimals);
            let px_decimals = PX_DECIMALS_BUDGET.saturating_sub(sz_decimals);
            let tick_size = Decimal::new(1, px_decimals);
            return Ok((index as u32, SymbolFilters::new(tick_size, step_size)));
        }
    }
    Err(bad_response(format!("coin {} missing from universe", coin)))
}

/// Deterministic 128-bit client order id derived from the strategy's
/// cycle/leg/attempt id.
fn cloid_for(client_id: &str) -> String {
    let digest = keccak256(client_id.as_bytes());
    format!("0x{}", hex::encode(&digest[..16]))
}

fn parse_order_response(body: &Value, client_id: &str) -> Result<OrderAck, ExecutorError> {
    if body["status"].as_str() != Some("ok") {
        return Err(ExecutorError::Rejected {
            venue: Venue::Hyperliquid,
            msg: body.to_string(),
        });
    }
    let statuses = body["response"]["data"]["statuses"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let first = statuses
        .first()
        .ok_or_else(|| bad_response(format!("no statuses in response: {}", body)))?;

    if let Some(err) = first["error"].as_str() {
        return Err(ExecutorError::Rejected {
            venue: Venue::Hyperliquid,
            msg: err.to_string(),
        });
    }
    if let Some(resting) = first.get("resting") {
        let oid = resting["oid"]
            .as_u64()
            .ok_or_else(|| bad_response(format!("resting without oid: {}", body)))?;
        return Ok(OrderAck {
            order_id: oid.to_string(),
            client_id: Some(client_id.to_string()),
            status: OrderStatus::New,
            filled_qty: None,
            avg_price: None,
            ts: Utc::now(),
        });
    }
    if let Some(filled) = first.get("filled") {
        let oid = filled["oid"]
            .as_u64()
            .ok_or_else(|| bad_response(format!("filled without oid: {}", body)))?;
        let total_sz = parse_decimal_field(filled, "totalSz").ok();
        let avg_px = parse_decimal_field(filled, "avgPx").ok();
        return Ok(OrderAck {
            order_id: oid.to_string(),
            client_id: Some(client_id.to_string()),
            status: OrderStatus::Filled,
            filled_qty: total_sz,
            avg_price: avg_px,
            ts: Utc::now(),
        });
    }
    Err(bad_response(format!("unrecognized order status: {}", first)))
}

fn parse_cancel_response(body: &Value, order_ids: &[String]) -> Result<OrderAck, ExecutorError> {
    if body["status"].as_str() != Some("ok") {
        return Err(ExecutorError::Rejected {
            venue: Venue::Hyperliquid,
            msg: body.to_string(),
        });
    }
    let order_id = order_ids.first().cloned().unwrap_or_default();
    // Per-order outcomes ("success" or {error}) are advisory; the user
    // stream delivers the terminal event either way.
    if let Some(statuses) = body["response"]["data"]["statuses"].as_array() {
        for status in statuses {
            if let Some(err) = status["error"].as_str() {
                warn!(%order_id, error = err, "cancel status carried an error");
            }
        }
    }
    Ok(OrderAck {
        order_id,
        client_id: None,
        status: OrderStatus::Canceled,
        filled_qty: None,
        avg_price: None,
        ts: Utc::now(),
    })
}

fn parse_order_status(body: &Value, order_id: &str) -> Result<OrderAck, ExecutorError> {
    let order = &body["order"]["order"];
    let raw_status = body["order"]["status"]
        .as_str()
        .or_else(|| order["status"].as_str())
        .unwrap_or("unknown");
    let cum_sz = parse_decimal_field(order, "origSz")
        .ok()
        .zip(parse_decimal_field(order, "sz").ok())
        .map(|(orig, remaining)| orig - remaining);

    let status = match raw_status {
        "open" => OrderStatus::New,
        "filled" => OrderStatus::Filled,
        "canceled" | "marginCanceled" => OrderStatus::Canceled,
        "rejected" => OrderStatus::Rejected,
        other => {
            warn!(status = other, %order_id, "unknown Hyperliquid order status");
            OrderStatus::Rejected
        }
    };
    Ok(OrderAck {
        order_id: order_id.to_string(),
        client_id: order["cloid"].as_str().map(str::to_string),
        status,
        filled_qty: cum_sz,
        avg_price: None,
        ts: Utc::now(),
    })
}

fn parse_decimal_field(value: &Value, field: &str) -> Result<Decimal, ExecutorError> {
    let raw = &value[field];
    if let Some(s) = raw.as_str() {
        return s
            .parse()
            .map_err(|e| bad_response(format!("bad decimal {} = {}: {}", field, s, e)));
    }
    if let Some(n) = raw.as_f64() {
        return Decimal::try_from(n).map_err(|e| bad_response(format!("bad decimal {}: {}", field, e)));
    }
    Err(bad_response(format!("missing field {}", field)))
}

fn transport(msg: String) -> ExecutorError {
    ExecutorError::Transport {
        venue: Venue::Hyperliquid,
        msg,
    }
}

fn bad_response(msg: String) -> ExecutorError {
    ExecutorError::BadResponse {
        venue: Venue::Hyperliquid,
        msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_resolve_asset() {
        let meta = json!({
            "universe": [
                {"name": "BTC", "szDecimals": 5, "maxLeverage": 50},
                {"name": "ETH", "szDecimals": 4, "maxLeverage": 50},
            ]
        });
        let (asset_id, filters) = resolve_asset(&meta, "ETH").unwrap();
        assert_eq!(asset_id, 1);
        assert_eq!(filters.step_size, dec!(0.0001));
        assert_eq!(filters.tick_size, dec!(0.01));

        assert!(resolve_asset(&meta, "SOL").is_err());
    }

    #[test]
    fn test_parse_resting_order() {
        let body = json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"resting": {"oid": 77738308}}]}}
        });
        let ack = parse_order_response(&body, "arb-1-l1-a1").unwrap();
        assert_eq!(ack.order_id, "77738308");
        assert_eq!(ack.status, OrderStatus::New);
        assert_eq!(ack.client_id.as_deref(), Some("arb-1-l1-a1"));
    }

    #[test]
    fn test_parse_immediately_filled_order() {
        let body = json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [
                {"filled": {"oid": 77738309, "totalSz": "0.001", "avgPx": "30019.5"}}
            ]}}
        });
        let ack = parse_order_response(&body, "arb-1-l2-a4").unwrap();
        assert_eq!(ack.status, OrderStatus::Filled);
        assert_eq!(ack.filled_qty, Some(dec!(0.001)));
        assert_eq!(ack.avg_price, Some(dec!(30019.5)));
    }

    #[test]
    fn test_parse_logic_reject() {
        let body = json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [
                {"error": "Insufficient margin to place order."}
            ]}}
        });
        let err = parse_order_response(&body, "arb-1-l1-a1").unwrap_err();
        assert!(!err.retriable());
        assert!(err.to_string().contains("Insufficient margin"));
    }

    #[test]
    fn test_parse_cancel_response() {
        let body = json!({
            "status": "ok",
            "response": {"type": "cancel", "data": {"statuses": ["success"]}}
        });
        let ack = parse_cancel_response(&body, &["77738308".to_string()]).unwrap();
        assert_eq!(ack.status, OrderStatus::Canceled);
        assert_eq!(ack.order_id, "77738308");
    }

    #[test]
    fn test_cloid_is_deterministic_hex128() {
        let a = cloid_for("arb-1-l1-a1");
        let b = cloid_for("arb-1-l1-a1");
        assert_eq!(a, b);
        assert!(a.starts_with("0x"));
        assert_eq!(a.len(), 2 + 32);
        assert_ne!(a, cloid_for("arb-1-l1-a2"));
    }
}
