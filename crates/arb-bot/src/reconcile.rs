//! Startup reconciler.
//!
//! Queries balances and positions on both venues and decides the
//! machine's initial state. Only two configurations are startable: both
//! venues flat, or a clean hedge (DEX long matched by a CEX short to
//! within one lot). Anything else refuses to start and the process
//! exits non-zero; the operator reconciles by hand.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::executor::binance::BinanceClient;
use crate::executor::hyperliquid::HyperliquidClient;
use crate::executor::ExecutorError;
use crate::strategy::InitialPosition;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// One-sided, same-sided, or size-mismatched positions.
    #[error("position mismatch: {detail}")]
    PositionMismatch { detail: String },

    #[error("venue query failed: {0}")]
    Venue(#[from] ExecutorError),
}

/// Decide the initial state from the two signed position sizes.
///
/// `lot` is the DEX lot size; positions within one lot of zero count as
/// flat, and the hedge sizes may differ by at most one lot.
pub fn classify_positions(
    cex_amt: Decimal,
    dex_szi: Decimal,
    lot: Decimal,
) -> Result<InitialPosition, ReconcileError> {
    let cex_flat = cex_amt.abs() < lot;
    let dex_flat = dex_szi.abs() < lot;

    if cex_flat && dex_flat {
        return Ok(InitialPosition::Flat);
    }
    if !cex_flat && !dex_flat && dex_szi > Decimal::ZERO && cex_amt < Decimal::ZERO {
        let imbalance = (dex_szi - cex_amt.abs()).abs();
        if imbalance <= lot {
            return Ok(InitialPosition::Hedged { qty: dex_szi });
        }
        return Err(ReconcileError::PositionMismatch {
            detail: format!(
                "hedge sizes differ beyond one lot: DEX {} vs CEX {}",
                dex_szi, cex_amt
            ),
        });
    }
    Err(ReconcileError::PositionMismatch {
        detail: format!("CEX position {} / DEX position {}", cex_amt, dex_szi),
    })
}

/// Fetch balances and positions and pick the initial state.
pub async fn determine_initial_state(
    binance: &BinanceClient,
    hyperliquid: &HyperliquidClient,
    cex_symbol: &str,
    lot: Decimal,
) -> Result<InitialPosition, ReconcileError> {
    let usdt = binance.usdt_balance().await?;
    let usdc = hyperliquid.usdc_balance().await?;
    info!(%usdt, %usdc, "venue balances");
    if usdt.is_zero() || usdc.is_zero() {
        warn!("a venue reports zero available balance");
    }

    let cex_amt = binance.position_amt(cex_symbol).await?;
    let dex_szi = hyperliquid.position_szi().await?;
    info!(%cex_amt, %dex_szi, "venue positions");

    let initial = classify_positions(cex_amt, dex_szi, lot)?;
    match initial {
        InitialPosition::Flat => info!("both venues flat, starting in OpenCondition"),
        InitialPosition::Hedged { qty } => {
            info!(%qty, "hedged position found, starting in CloseCondition")
        }
    }
    Ok(initial)
}
