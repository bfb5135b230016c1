//! Configuration for arb-bot.
//!
//! Supports loading from a TOML file with environment variable overrides
//! for credentials. The `testnet` flag selects between mainnet and testnet
//! endpoint pairs when no explicit URL is configured.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

// Endpoint pairs selected by the `testnet` flag.
const BINANCE_FUTURES_WS: &str = "wss://fstream.binance.com";
const BINANCE_FUTURES_WS_TESTNET: &str = "wss://fstream.binancefuture.com";
const BINANCE_FUTURES_REST: &str = "https://fapi.binance.com";
const BINANCE_FUTURES_REST_TESTNET: &str = "https://testnet.binancefuture.com";
const HYPERLIQUID_WS: &str = "wss://api.hyperliquid.xyz/ws";
const HYPERLIQUID_WS_TESTNET: &str = "wss://api.hyperliquid-testnet.xyz/ws";
const HYPERLIQUID_REST: &str = "https://api.hyperliquid.xyz";
const HYPERLIQUID_REST_TESTNET: &str = "https://api.hyperliquid-testnet.xyz";

/// Top-level configuration for arb-bot.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Logging level (trace/debug/info/warn/error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Use testnet endpoints and credentials.
    #[serde(default)]
    pub testnet: bool,

    /// Venue endpoints, credentials and instrument identifiers.
    #[serde(default)]
    pub venues: VenueConfig,

    /// Maker/taker fee rates per venue, as decimal rates.
    #[serde(default)]
    pub fees: FeeSchedule,

    /// Signal and sizing parameters.
    #[serde(default)]
    pub trading: TradingConfig,

    /// Order lifecycle timeouts and retry limits.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Venue endpoints and credentials.
///
/// Empty URL fields fall back to the mainnet/testnet defaults at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VenueConfig {
    #[serde(default)]
    pub cex_ws_url: String,
    #[serde(default)]
    pub cex_rest_url: String,
    #[serde(default)]
    pub dex_ws_url: String,
    #[serde(default)]
    pub dex_rest_url: String,

    #[serde(default)]
    pub cex_api_key: String,
    #[serde(default)]
    pub cex_secret: String,
    #[serde(default)]
    pub dex_wallet: String,
    #[serde(default)]
    pub dex_private_key: String,

    #[serde(default = "default_cex_symbol")]
    pub cex_symbol: String,
    #[serde(default = "default_dex_symbol")]
    pub dex_symbol: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            cex_ws_url: String::new(),
            cex_rest_url: String::new(),
            dex_ws_url: String::new(),
            dex_rest_url: String::new(),
            cex_api_key: String::new(),
            cex_secret: String::new(),
            dex_wallet: String::new(),
            dex_private_key: String::new(),
            cex_symbol: default_cex_symbol(),
            dex_symbol: default_dex_symbol(),
        }
    }
}

/// Fee schedule as decimal rates (0.0002 = 2 bps).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeSchedule {
    #[serde(default = "default_maker_fee")]
    pub cex_maker_fee: Decimal,
    #[serde(default = "default_taker_fee")]
    pub cex_taker_fee: Decimal,
    #[serde(default = "default_maker_fee")]
    pub dex_maker_fee: Decimal,
    #[serde(default = "default_taker_fee")]
    pub dex_taker_fee: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            cex_maker_fee: default_maker_fee(),
            cex_taker_fee: default_taker_fee(),
            dex_maker_fee: default_maker_fee(),
            dex_taker_fee: default_taker_fee(),
        }
    }
}

/// Signal threshold and cycle sizing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingConfig {
    /// Minimum fee-adjusted edge required to trade, in absolute
    /// quote units. Comparison is strict `>`.
    #[serde(default)]
    pub min_spread_threshold: Decimal,

    /// Per-cycle hedge size in base units.
    #[serde(default = "default_cycle_qty")]
    pub cycle_qty: Decimal,

    /// Quotes older than this are treated as absent.
    #[serde(default = "default_max_quote_age_ms")]
    pub max_quote_age_ms: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            min_spread_threshold: Decimal::ZERO,
            cycle_qty: default_cycle_qty(),
            max_quote_age_ms: default_max_quote_age_ms(),
        }
    }
}

impl TradingConfig {
    pub fn max_quote_age(&self) -> Duration {
        Duration::from_millis(self.max_quote_age_ms)
    }
}

/// Order lifecycle timeouts.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Per-order timeout before a cancel is issued (seconds).
    #[serde(default = "default_t_order_secs")]
    pub t_order_secs: u64,

    /// Cancel-ack timeout before the cancel is retried (seconds).
    #[serde(default = "default_t_cancel_secs")]
    pub t_cancel_secs: u64,

    /// Cancel retries before the cycle is aborted.
    #[serde(default = "default_n_cancel_retry")]
    pub n_cancel_retry: u32,

    /// Limit reposts before the Leg2 chase falls back to market.
    #[serde(default = "default_chase_limit_attempts")]
    pub chase_limit_attempts: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            t_order_secs: default_t_order_secs(),
            t_cancel_secs: default_t_cancel_secs(),
            n_cancel_retry: default_n_cancel_retry(),
            chase_limit_attempts: default_chase_limit_attempts(),
        }
    }
}

impl TimeoutConfig {
    pub fn t_order(&self) -> Duration {
        Duration::from_secs(self.t_order_secs)
    }

    pub fn t_cancel(&self) -> Duration {
        Duration::from_secs(self.t_cancel_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cex_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_dex_symbol() -> String {
    "BTC".to_string()
}

fn default_maker_fee() -> Decimal {
    dec!(0.0002)
}

fn default_taker_fee() -> Decimal {
    dec!(0.0004)
}

fn default_cycle_qty() -> Decimal {
    dec!(0.001)
}

fn default_max_quote_age_ms() -> u64 {
    1_000
}

fn default_t_order_secs() -> u64 {
    5
}

fn default_t_cancel_secs() -> u64 {
    5
}

fn default_n_cancel_retry() -> u32 {
    3
}

fn default_chase_limit_attempts() -> u32 {
    3
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            testnet: false,
            venues: VenueConfig::default(),
            fees: FeeSchedule::default(),
            trading: TradingConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: BotConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config file {:?}", path))?;
        Ok(config)
    }

    /// Apply credential overrides from environment variables.
    ///
    /// Recognized: `ARB_CEX_API_KEY`, `ARB_CEX_SECRET`, `ARB_DEX_WALLET`,
    /// `ARB_DEX_PRIVATE_KEY`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ARB_CEX_API_KEY") {
            self.venues.cex_api_key = v;
        }
        if let Ok(v) = std::env::var("ARB_CEX_SECRET") {
            self.venues.cex_secret = v;
        }
        if let Ok(v) = std::env::var("ARB_DEX_WALLET") {
            self.venues.dex_wallet = v;
        }
        if let Ok(v) = std::env::var("ARB_DEX_PRIVATE_KEY") {
            self.venues.dex_private_key = v;
        }
    }

    /// Fill empty endpoint fields from the mainnet/testnet defaults.
    pub fn resolve_endpoints(&mut self) {
        let v = &mut self.venues;
        if v.cex_ws_url.is_empty() {
            v.cex_ws_url = if self.testnet {
                BINANCE_FUTURES_WS_TESTNET
            } else {
                BINANCE_FUTURES_WS
            }
            .to_string();
        }
        if v.cex_rest_url.is_empty() {
            v.cex_rest_url = if self.testnet {
                BINANCE_FUTURES_REST_TESTNET
            } else {
                BINANCE_FUTURES_REST
            }
            .to_string();
        }
        if v.dex_ws_url.is_empty() {
            v.dex_ws_url = if self.testnet {
                HYPERLIQUID_WS_TESTNET
            } else {
                HYPERLIQUID_WS
            }
            .to_string();
        }
        if v.dex_rest_url.is_empty() {
            v.dex_rest_url = if self.testnet {
                HYPERLIQUID_REST_TESTNET
            } else {
                HYPERLIQUID_REST
            }
            .to_string();
        }
    }

    /// Validate the configuration before wiring anything up.
    pub fn validate(&self) -> Result<()> {
        if self.trading.cycle_qty <= Decimal::ZERO {
            bail!("trading.cycle_qty must be positive");
        }
        for (name, fee) in [
            ("cex_maker_fee", self.fees.cex_maker_fee),
            ("cex_taker_fee", self.fees.cex_taker_fee),
            ("dex_maker_fee", self.fees.dex_maker_fee),
            ("dex_taker_fee", self.fees.dex_taker_fee),
        ] {
            if fee < Decimal::ZERO || fee >= Decimal::ONE {
                bail!("fees.{} out of range: {}", name, fee);
            }
        }
        if self.venues.cex_symbol.is_empty() || self.venues.dex_symbol.is_empty() {
            bail!("both venues.cex_symbol and venues.dex_symbol are required");
        }
        if self.timeouts.t_order_secs == 0 {
            bail!("timeouts.t_order_secs must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.venues.cex_symbol, "BTCUSDT");
        assert_eq!(cfg.venues.dex_symbol, "BTC");
        assert_eq!(cfg.fees.cex_maker_fee, dec!(0.0002));
        assert_eq!(cfg.fees.dex_taker_fee, dec!(0.0004));
        assert_eq!(cfg.trading.min_spread_threshold, Decimal::ZERO);
        assert_eq!(cfg.trading.cycle_qty, dec!(0.001));
        assert_eq!(cfg.timeouts.t_order(), Duration::from_secs(5));
        assert_eq!(cfg.timeouts.chase_limit_attempts, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let cfg: BotConfig = toml::from_str(
            r#"
            testnet = true
            log_level = "debug"

            [venues]
            cex_symbol = "ETHUSDT"
            dex_symbol = "ETH"

            [fees]
            cex_taker_fee = 0.0005

            [trading]
            min_spread_threshold = 1.5
            cycle_qty = 0.01

            [timeouts]
            t_order_secs = 3
            "#,
        )
        .unwrap();

        assert!(cfg.testnet);
        assert_eq!(cfg.venues.cex_symbol, "ETHUSDT");
        assert_eq!(cfg.fees.cex_taker_fee, dec!(0.0005));
        assert_eq!(cfg.fees.cex_maker_fee, dec!(0.0002));
        assert_eq!(cfg.trading.min_spread_threshold, dec!(1.5));
        assert_eq!(cfg.timeouts.t_order_secs, 3);
    }

    #[test]
    fn test_resolve_endpoints_testnet() {
        let mut cfg = BotConfig {
            testnet: true,
            ..Default::default()
        };
        cfg.resolve_endpoints();
        assert_eq!(cfg.venues.cex_ws_url, BINANCE_FUTURES_WS_TESTNET);
        assert_eq!(cfg.venues.dex_rest_url, HYPERLIQUID_REST_TESTNET);

        let mut cfg = BotConfig::default();
        cfg.venues.dex_ws_url = "wss://example.test/ws".to_string();
        cfg.resolve_endpoints();
        // Explicit URL wins over the default.
        assert_eq!(cfg.venues.dex_ws_url, "wss://example.test/ws");
        assert_eq!(cfg.venues.cex_ws_url, BINANCE_FUTURES_WS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = BotConfig::default();
        cfg.trading.cycle_qty = Decimal::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::default();
        cfg.fees.cex_maker_fee = dec!(1.5);
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::default();
        cfg.venues.dex_symbol = String::new();
        assert!(cfg.validate().is_err());
    }
}
