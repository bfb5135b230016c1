//! 1 Hz tick scheduler.
//!
//! Each tick briefly takes the strategy mutex: expired orders are
//! canceled, unacknowledged cancels escalate, and in Condition states
//! the signal is re-evaluated against the latest board snapshot.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::info;

use crate::executor::VenueExecutor;
use crate::strategy::StrategyHandle;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Run the timer until shutdown.
pub async fn run_ticker<E: VenueExecutor>(
    strategy: StrategyHandle<E>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                strategy.on_timer_tick(Instant::now()).await;
            }
            _ = shutdown.recv() => {
                info!("tick scheduler stopped");
                return;
            }
        }
    }
}
