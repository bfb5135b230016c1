//! The two-leg strategy state machine.
//!
//! Leg1 always rests as a maker order on the DEX (thinner book, better
//! price capture); once it fills, Leg2 hedges the exact filled quantity
//! as a taker on the CEX. Partial fills, timeouts, and cancel races all
//! funnel through the same three event kinds, and the Leg2 remainder is
//! chased at the refreshed best opposite price, falling back to a market
//! order after `chase_limit_attempts` limit reposts.
//!
//! One mutex (owned by [`StrategyHandle`]) serializes every handler and
//! is held across the synchronous venue call, so an order is registered
//! in the slot before any fill event for it can be processed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use arb_common::{Side, Venue};

use crate::board::PriceBoard;
use crate::executor::{CancelOrder, OrderStatus, PlaceOrder, SymbolFilters, VenueExecutor};
use crate::strategy::events::{OrderEvent, OrderEventKind};
use crate::strategy::state::{ActiveOrder, PositionLedger, StrategyState};

/// Strategy parameters, assembled from `BotConfig` plus the symbol
/// filters fetched at startup.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub cex_symbol: String,
    pub dex_symbol: String,
    pub cycle_qty: Decimal,
    pub min_spread_threshold: Decimal,
    pub t_order: Duration,
    pub t_cancel: Duration,
    pub n_cancel_retry: u32,
    pub chase_limit_attempts: u32,
    pub cex_filters: SymbolFilters,
    pub dex_filters: SymbolFilters,
}

/// Position found by the startup reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialPosition {
    /// Both venues flat.
    Flat,
    /// DEX long / CEX short of this size.
    Hedged { qty: Decimal },
}

/// Which traversal a cycle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleDir {
    Open,
    Close,
}

impl CycleDir {
    fn leg2_side(&self) -> Side {
        match self {
            CycleDir::Open => Side::Sell,
            CycleDir::Close => Side::Buy,
        }
    }
}

/// The state machine. Drive it through [`StrategyHandle`].
pub struct StrategyMachine<E> {
    cfg: StrategyConfig,
    executor: Arc<E>,
    board: Arc<PriceBoard>,
    state: StrategyState,
    slot: Option<ActiveOrder>,
    ledger: PositionLedger,
    /// Leg2 placements made this cycle; attempts past
    /// `chase_limit_attempts` go to market.
    chase_attempt: u32,
    cancel_sent_at: Option<Instant>,
    cancel_retries: u32,
    cycle_seq: u64,
}

impl<E: VenueExecutor> StrategyMachine<E> {
    pub fn new(
        cfg: StrategyConfig,
        executor: Arc<E>,
        board: Arc<PriceBoard>,
        initial: InitialPosition,
    ) -> Self {
        let (state, held_qty) = match initial {
            InitialPosition::Flat => (StrategyState::OpenCondition, Decimal::ZERO),
            InitialPosition::Hedged { qty } => (StrategyState::CloseCondition, qty),
        };
        info!(%state, %held_qty, "strategy machine initialized");
        Self {
            cfg,
            executor,
            board,
            state,
            slot: None,
            ledger: PositionLedger {
                held_qty,
                ..Default::default()
            },
            chase_attempt: 0,
            cancel_sent_at: None,
            cancel_retries: 0,
            cycle_seq: 0,
        }
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn ledger(&self) -> PositionLedger {
        self.ledger
    }

    pub fn active_order(&self) -> Option<&ActiveOrder> {
        self.slot.as_ref()
    }

    fn set_state(&mut self, next: StrategyState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }

    fn client_id(&self, leg: u8, attempt: u32) -> String {
        format!("arb-{}-l{}-a{}", self.cycle_seq, leg, attempt)
    }

    /// One lot on the DEX; residual positions below this count as flat.
    fn min_lot(&self) -> Decimal {
        self.cfg.dex_filters.step_size
    }

    // ==================== signal ticks ====================

    /// Evaluate the fee-adjusted edges in a Condition state.
    ///
    /// Comparison against the threshold is strict `>`; a zero-edge tick
    /// with a zero threshold never fires.
    pub async fn on_signal_tick(&mut self) {
        match self.state {
            StrategyState::OpenCondition => {
                let Some(edges) = self.board.net_spread() else {
                    return;
                };
                if edges.open_edge > self.cfg.min_spread_threshold {
                    info!(edge = %edges.open_edge, "open signal fired");
                    self.begin_cycle(CycleDir::Open).await;
                }
            }
            StrategyState::CloseCondition => {
                let Some(edges) = self.board.net_spread() else {
                    return;
                };
                if edges.close_edge > self.cfg.min_spread_threshold {
                    info!(edge = %edges.close_edge, "close signal fired");
                    self.begin_cycle(CycleDir::Close).await;
                }
            }
            _ => {}
        }
    }

    /// Place Leg1: a maker order on the DEX at the current best price.
    ///
    /// The price is pinned at placement and never improved mid-life.
    async fn begin_cycle(&mut self, dir: CycleDir) {
        let (side, raw_qty, book_side) = match dir {
            CycleDir::Open => (Side::Buy, self.cfg.cycle_qty, Side::Buy),
            CycleDir::Close => (Side::Sell, self.ledger.held_qty, Side::Sell),
        };
        let Some(raw_price) = self.board.get(Venue::Hyperliquid, book_side) else {
            warn!(%side, "no fresh DEX price, skipping cycle");
            return;
        };

        let qty = self.cfg.dex_filters.round_qty_down(raw_qty);
        if qty.is_zero() {
            warn!(%raw_qty, "quantity rounds to zero, aborting cycle");
            return;
        }
        let price = self.cfg.dex_filters.round_price_passive(raw_price, side);

        self.cycle_seq += 1;
        self.ledger.begin_cycle(qty);
        self.chase_attempt = 0;
        self.cancel_retries = 0;

        let client_id = self.client_id(1, 1);
        let req = PlaceOrder::limit(
            Venue::Hyperliquid,
            self.cfg.dex_symbol.clone(),
            side,
            qty,
            price,
            client_id.clone(),
        );
        let placed = self.executor.place_order(req).await;
        match placed {
            Ok(ack) if ack.status != OrderStatus::Rejected => {
                info!(order_id = %ack.order_id, %price, %qty, "leg1 placed");
                self.slot = Some(ActiveOrder {
                    venue: Venue::Hyperliquid,
                    symbol: self.cfg.dex_symbol.clone(),
                    side,
                    order_id: ack.order_id,
                    client_id,
                    price: Some(price),
                    qty_total: qty,
                    qty_filled: Decimal::ZERO,
                    placed_at: Instant::now(),
                    chase_attempt: 0,
                });
                self.set_state(match dir {
                    CycleDir::Open => StrategyState::OpenLeg1Waiting,
                    CycleDir::Close => StrategyState::CloseLeg1Waiting,
                });
            }
            Ok(ack) => {
                warn!(status = %ack.status, "leg1 placement rejected, staying idle");
                self.ledger.reset_cycle();
            }
            Err(e) => {
                warn!(error = %e, retriable = e.retriable(), "leg1 placement failed");
                self.ledger.reset_cycle();
                if e.is_filter_reject() {
                    // Stale precision metadata; the next signal rounds
                    // with the refreshed filters.
                    self.refresh_filters(Venue::Hyperliquid).await;
                }
            }
        }
    }

    // ==================== user-stream events ====================

    /// Apply a terminal user-stream event.
    ///
    /// Events for ids not in the slot are dropped (reconnect replay, or
    /// the cancel ack of an order that already filled).
    pub async fn on_order_event(&mut self, event: OrderEvent) {
        let Some(slot) = self.slot.as_mut() else {
            debug!(order_id = %event.order_id, "event for empty slot, dropped");
            return;
        };
        if slot.order_id != event.order_id {
            warn!(
                got = %event.order_id,
                active = %slot.order_id,
                "event for unknown order, dropped"
            );
            return;
        }

        // Fills are cumulative; never let a stale report walk them back.
        let reported = event.kind.filled_qty();
        if reported > slot.qty_filled {
            slot.qty_filled = reported;
        }
        let filled = slot.qty_filled;
        debug!(state = %self.state, kind = ?event.kind, %filled, "order event");

        match self.state {
            StrategyState::OpenLeg1Waiting | StrategyState::OpenLeg1Canceling => {
                self.on_leg1_event(event.kind, filled, CycleDir::Open).await;
            }
            StrategyState::CloseLeg1Waiting | StrategyState::CloseLeg1Canceling => {
                self.on_leg1_event(event.kind, filled, CycleDir::Close).await;
            }
            StrategyState::OpenLeg2Waiting | StrategyState::OpenLeg2Chasing => {
                self.on_leg2_event(filled, CycleDir::Open).await;
            }
            StrategyState::CloseLeg2Waiting | StrategyState::CloseLeg2Chasing => {
                self.on_leg2_event(filled, CycleDir::Close).await;
            }
            StrategyState::OpenCondition | StrategyState::CloseCondition => {
                warn!(state = %self.state, "terminal event while idle, dropped");
            }
        }
    }

    async fn on_leg1_event(&mut self, kind: OrderEventKind, filled: Decimal, dir: CycleDir) {
        match kind {
            OrderEventKind::AllTraded { .. } => {
                // Also covers the lost cancel race: a fill arriving in
                // *Canceling is handled exactly like one in *Waiting.
                self.clear_slot();
                self.ledger.leg1_filled_qty = filled;
                info!(%filled, "leg1 fully filled, hedging");
                self.start_leg2(dir).await;
            }
            OrderEventKind::PartialFilledCanceled { .. } if filled > Decimal::ZERO => {
                if matches!(
                    self.state,
                    StrategyState::OpenLeg1Waiting | StrategyState::CloseLeg1Waiting
                ) {
                    // Cancels originate from us, so this should only
                    // arrive in *Canceling.
                    warn!(state = %self.state, "partial-canceled before our cancel was issued");
                }
                self.clear_slot();
                self.ledger.leg1_filled_qty = filled;
                info!(%filled, "leg1 partially filled then canceled, hedging the fill");
                self.start_leg2(dir).await;
            }
            OrderEventKind::PartialFilledCanceled { .. } | OrderEventKind::AllCanceled => {
                self.clear_slot();
                let next = match dir {
                    CycleDir::Open => StrategyState::OpenCondition,
                    // Nothing was closed; keep scanning for a close
                    // unless the position is already gone.
                    CycleDir::Close => {
                        if self.ledger.held_qty >= self.min_lot() {
                            StrategyState::CloseCondition
                        } else {
                            StrategyState::OpenCondition
                        }
                    }
                };
                self.ledger.reset_cycle();
                self.set_state(next);
            }
        }
    }

    async fn on_leg2_event(&mut self, filled: Decimal, dir: CycleDir) {
        self.clear_slot();
        // `filled` is cumulative for the order that just terminated;
        // chase reposts are separate orders, so the cycle total is the
        // sum of each order's terminal cumulative.
        self.ledger.leg2_filled_qty += filled;
        let remaining = self.ledger.leg2_remaining();
        if remaining.is_zero() || self.cfg.cex_filters.round_qty_down(remaining).is_zero() {
            self.complete_cycle(dir);
        } else {
            self.place_leg2(remaining, dir).await;
        }
    }

    fn complete_cycle(&mut self, dir: CycleDir) {
        let hedged = self.ledger.leg1_filled_qty;
        match dir {
            CycleDir::Open => {
                self.ledger.held_qty += hedged;
                info!(held = %self.ledger.held_qty, "open cycle complete");
                self.ledger.reset_cycle();
                self.chase_attempt = 0;
                self.set_state(StrategyState::CloseCondition);
            }
            CycleDir::Close => {
                self.ledger.held_qty = (self.ledger.held_qty - hedged).max(Decimal::ZERO);
                info!(held = %self.ledger.held_qty, "close cycle complete");
                self.ledger.reset_cycle();
                self.chase_attempt = 0;
                let next = if self.ledger.held_qty >= self.min_lot() {
                    // Partial close: residual position still needs
                    // unwinding on the next signal.
                    StrategyState::CloseCondition
                } else {
                    StrategyState::OpenCondition
                };
                self.set_state(next);
            }
        }
    }

    /// Start the CEX hedge for exactly the Leg1 fill.
    async fn start_leg2(&mut self, dir: CycleDir) {
        self.chase_attempt = 0;
        self.ledger.leg2_filled_qty = Decimal::ZERO;
        let remaining = self.ledger.leg2_remaining();
        self.place_leg2(remaining, dir).await;
    }

    /// Place or repost the Leg2 hedge.
    ///
    /// Limit at the refreshed best opposite price while
    /// `chase_attempt < chase_limit_attempts`; market afterwards, or
    /// immediately when no fresh CEX price is available.
    async fn place_leg2(&mut self, remaining: Decimal, dir: CycleDir) {
        let side = dir.leg2_side();
        let qty = self.cfg.cex_filters.round_qty_down(remaining);
        if qty.is_zero() {
            debug!(%remaining, "leg2 remainder below one lot, cycle complete");
            self.complete_cycle(dir);
            return;
        }

        self.chase_attempt += 1;
        let attempt = self.chase_attempt;
        let client_id = self.client_id(2, attempt);

        // Sells hit the bid, buys lift the ask.
        let opposite = match side {
            Side::Sell => self.board.get(Venue::Binance, Side::Buy),
            Side::Buy => self.board.get(Venue::Binance, Side::Sell),
        };
        let price = if attempt <= self.cfg.chase_limit_attempts {
            match opposite {
                Some(p) => Some(self.cfg.cex_filters.round_price_aggressive(p, side)),
                None => {
                    warn!("no fresh CEX price for chase, falling back to market");
                    None
                }
            }
        } else {
            info!(attempt, "chase limit exhausted, going to market");
            None
        };

        let req = match price {
            Some(price) => PlaceOrder::limit(
                Venue::Binance,
                self.cfg.cex_symbol.clone(),
                side,
                qty,
                price,
                client_id.clone(),
            ),
            None => PlaceOrder::market(
                Venue::Binance,
                self.cfg.cex_symbol.clone(),
                side,
                qty,
                client_id.clone(),
            ),
        };

        let placed = self.executor.place_order(req).await;
        match placed {
            Ok(ack) if ack.status != OrderStatus::Rejected => {
                info!(order_id = %ack.order_id, attempt, %qty, price = ?price, "leg2 placed");
                self.slot = Some(ActiveOrder {
                    venue: Venue::Binance,
                    symbol: self.cfg.cex_symbol.clone(),
                    side,
                    order_id: ack.order_id,
                    client_id,
                    price,
                    qty_total: qty,
                    qty_filled: Decimal::ZERO,
                    placed_at: Instant::now(),
                    chase_attempt: attempt,
                });
                let next = match (dir, attempt) {
                    (CycleDir::Open, 1) => StrategyState::OpenLeg2Waiting,
                    (CycleDir::Open, _) => StrategyState::OpenLeg2Chasing,
                    (CycleDir::Close, 1) => StrategyState::CloseLeg2Waiting,
                    (CycleDir::Close, _) => StrategyState::CloseLeg2Chasing,
                };
                self.set_state(next);
            }
            Ok(ack) => {
                error!(status = %ack.status, "leg2 placement rejected");
                self.abort_cycle("leg2 venue reject").await;
            }
            Err(e) if e.retriable() => {
                // Keep the leg2 state; the timer retries the placement
                // on its next tick via the empty-slot path.
                warn!(error = %e, "leg2 placement transport failure, will retry");
                let next = match dir {
                    CycleDir::Open => StrategyState::OpenLeg2Chasing,
                    CycleDir::Close => StrategyState::CloseLeg2Chasing,
                };
                self.set_state(next);
            }
            Err(e) => {
                error!(error = %e, "leg2 placement failed");
                let refreshed =
                    e.is_filter_reject() && self.refresh_filters(Venue::Binance).await;
                if refreshed {
                    // The timer's empty-slot path reposts with the
                    // fresh filters.
                    let next = match dir {
                        CycleDir::Open => StrategyState::OpenLeg2Chasing,
                        CycleDir::Close => StrategyState::CloseLeg2Chasing,
                    };
                    self.set_state(next);
                } else {
                    self.abort_cycle("leg2 placement reject").await;
                }
            }
        }
    }

    /// Re-fetch a venue's tick/lot filters after a filter-shaped
    /// reject. Returns true when the cached values changed.
    async fn refresh_filters(&mut self, venue: Venue) -> bool {
        let symbol = match venue {
            Venue::Binance => self.cfg.cex_symbol.clone(),
            Venue::Hyperliquid => self.cfg.dex_symbol.clone(),
        };
        let fetched = self.executor.symbol_filters(venue, &symbol).await;
        let fresh = match fetched {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, %venue, "filter re-fetch failed");
                return false;
            }
        };
        let cached = match venue {
            Venue::Binance => &mut self.cfg.cex_filters,
            Venue::Hyperliquid => &mut self.cfg.dex_filters,
        };
        if *cached == fresh {
            debug!(%venue, "filters unchanged after re-fetch");
            return false;
        }
        info!(
            %venue,
            tick = %fresh.tick_size,
            step = %fresh.step_size,
            "symbol filters refreshed"
        );
        *cached = fresh;
        true
    }

    // ==================== timer ticks ====================

    /// 1 Hz maintenance: signal re-evaluation in Condition states,
    /// order timeouts, cancel-ack escalation, and leg2 retry.
    pub async fn on_timer_tick(&mut self, now: Instant) {
        if self.state.is_condition() {
            self.on_signal_tick().await;
            return;
        }

        // Cancel-ack escalation.
        if let Some(sent) = self.cancel_sent_at {
            if now.duration_since(sent) > self.cfg.t_cancel {
                if self.cancel_retries < self.cfg.n_cancel_retry {
                    self.cancel_retries += 1;
                    warn!(retry = self.cancel_retries, "cancel unacknowledged, retrying");
                    self.send_cancel(now).await;
                } else {
                    error!(
                        retries = self.cancel_retries,
                        "cancel never acknowledged, aborting cycle; operator attention required"
                    );
                    self.abort_cycle("cancel ack timeout").await;
                }
                return;
            }
        }

        let dir = if self.state.is_open_cycle() {
            CycleDir::Open
        } else {
            CycleDir::Close
        };

        // A leg2 placement that failed on transport left the slot empty;
        // retry it now.
        if self.slot.is_none() {
            if self.state.is_leg2() {
                let remaining = self.ledger.leg2_remaining();
                self.place_leg2(remaining, dir).await;
            }
            return;
        }

        let expired = {
            let slot = self.slot.as_ref().expect("slot checked above");
            now.duration_since(slot.placed_at) > self.cfg.t_order
        };
        if !expired || self.cancel_sent_at.is_some() {
            return;
        }

        match self.state {
            StrategyState::OpenLeg1Waiting => {
                warn!("leg1 order timed out, canceling");
                self.set_state(StrategyState::OpenLeg1Canceling);
                self.send_cancel(now).await;
            }
            StrategyState::CloseLeg1Waiting => {
                warn!("leg1 order timed out, canceling");
                self.set_state(StrategyState::CloseLeg1Canceling);
                self.send_cancel(now).await;
            }
            StrategyState::OpenLeg2Waiting
            | StrategyState::OpenLeg2Chasing
            | StrategyState::CloseLeg2Waiting
            | StrategyState::CloseLeg2Chasing => {
                // The cancel's terminal event carries the remainder and
                // drives the next chase step.
                warn!("leg2 order timed out, canceling to chase");
                self.send_cancel(now).await;
            }
            _ => {}
        }
    }

    async fn send_cancel(&mut self, now: Instant) {
        let Some(slot) = self.slot.as_ref() else {
            return;
        };
        let req = CancelOrder::single(slot.venue, slot.symbol.clone(), slot.order_id.clone());
        let canceled = self.executor.cancel_order(req).await;
        match canceled {
            Ok(_) => {
                self.cancel_sent_at = Some(now);
            }
            Err(e) if e.retriable() => {
                warn!(error = %e, "cancel transport failure, will retry");
                self.cancel_sent_at = Some(now);
            }
            Err(e) => {
                // Likely "order does not exist": the fill won the race
                // and its user-stream event is on the way.
                debug!(error = %e, "cancel rejected by venue");
                self.cancel_sent_at = Some(now);
            }
        }
    }

    /// Quiesce to the governing Condition state after a best-effort
    /// cancel. The position may be unhedged; the operator reconciles.
    async fn abort_cycle(&mut self, reason: &str) {
        error!(
            reason,
            state = %self.state,
            leg1 = %self.ledger.leg1_filled_qty,
            leg2 = %self.ledger.leg2_filled_qty,
            "aborting cycle"
        );
        if self.slot.is_some() {
            self.send_cancel(Instant::now()).await;
        }
        let next = self.state.governing_condition();
        self.clear_slot();
        self.ledger.reset_cycle();
        self.chase_attempt = 0;
        self.set_state(next);
    }

    fn clear_slot(&mut self) {
        self.slot = None;
        self.cancel_sent_at = None;
        self.cancel_retries = 0;
    }

    /// Follow up the in-flight order after a user-stream reconnect.
    ///
    /// A terminal event published while the stream was down never
    /// replays, so the order is queried directly and the event
    /// synthesized. Non-terminal statuses leave the slot alone.
    pub async fn resync_inflight(&mut self, venue: Venue) {
        let Some(slot) = self.slot.as_ref() else {
            return;
        };
        if slot.venue != venue {
            return;
        }
        let symbol = slot.symbol.clone();
        let order_id = slot.order_id.clone();
        let queried = self.executor.query_order(venue, &symbol, &order_id).await;
        let ack = match queried {
            Ok(ack) => ack,
            Err(e) => {
                warn!(error = %e, %order_id, "in-flight order query failed");
                return;
            }
        };
        let filled = ack.filled_qty.unwrap_or(Decimal::ZERO);
        let event = match ack.status {
            OrderStatus::Filled => Some(OrderEvent::all_traded(venue, order_id.clone(), filled)),
            OrderStatus::Canceled | OrderStatus::Rejected => {
                if filled > Decimal::ZERO {
                    Some(OrderEvent::partial_filled_canceled(
                        venue,
                        order_id.clone(),
                        filled,
                    ))
                } else {
                    Some(OrderEvent::all_canceled(venue, order_id.clone()))
                }
            }
            OrderStatus::New | OrderStatus::PartiallyFilled => None,
        };
        if let Some(event) = event {
            info!(%order_id, status = %ack.status, "order terminated while stream was down");
            self.on_order_event(event).await;
        }
    }

    /// Best-effort cancel of any in-flight order, for shutdown.
    pub async fn cancel_inflight(&mut self) {
        if let Some(slot) = self.slot.as_ref() {
            info!(order_id = %slot.order_id, "canceling in-flight order for shutdown");
            let req = CancelOrder::single(slot.venue, slot.symbol.clone(), slot.order_id.clone());
            if let Err(e) = self.executor.cancel_order(req).await {
                warn!(error = %e, "shutdown cancel failed");
            }
        }
    }
}

/// The capability the strategy publishes to the venue adapters: a clone
/// of this handle is all an adapter needs to drive the machine.
pub struct StrategyHandle<E> {
    inner: Arc<Mutex<StrategyMachine<E>>>,
}

impl<E> Clone for StrategyHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: VenueExecutor> StrategyHandle<E> {
    pub fn new(machine: StrategyMachine<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    /// Signal tick, invoked on every CEX book update.
    pub async fn on_signal_tick(&self) {
        self.inner.lock().await.on_signal_tick().await;
    }

    /// Terminal order event from a user-stream adapter.
    pub async fn on_order_event(&self, event: OrderEvent) {
        self.inner.lock().await.on_order_event(event).await;
    }

    /// 1 Hz maintenance tick.
    pub async fn on_timer_tick(&self, now: Instant) {
        self.inner.lock().await.on_timer_tick(now).await;
    }

    pub async fn state(&self) -> StrategyState {
        self.inner.lock().await.state()
    }

    pub async fn ledger(&self) -> PositionLedger {
        self.inner.lock().await.ledger()
    }

    pub async fn resync_inflight(&self, venue: Venue) {
        self.inner.lock().await.resync_inflight(venue).await;
    }

    pub async fn cancel_inflight(&self) {
        self.inner.lock().await.cancel_inflight().await;
    }
}
