//! End-to-end strategy scenarios over a scripted executor.
//!
//! These drive the state machine exactly the way production does —
//! signal ticks, user-stream events, timer ticks — with a mock venue
//! executor recording every placement and cancel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use arb_bot::config::{FeeSchedule, TradingConfig};
use arb_bot::executor::{
    CancelOrder, ExecutorError, OrderAck, OrderStatus, PlaceOrder, SymbolFilters, VenueExecutor,
};
use arb_bot::strategy::{
    InitialPosition, OrderEvent, StrategyConfig, StrategyHandle, StrategyMachine, StrategyState,
};
use arb_bot::PriceBoard;
use arb_common::{Side, Venue};

/// Records every call and acks placements with sequential ids M1, M2...
struct MockExecutor {
    places: Mutex<Vec<PlaceOrder>>,
    cancels: Mutex<Vec<CancelOrder>>,
    seq: AtomicU64,
    scripted_failures: Mutex<VecDeque<ExecutorError>>,
    filters: Mutex<SymbolFilters>,
    filter_queries: AtomicU64,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self {
            places: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            scripted_failures: Mutex::new(VecDeque::new()),
            filters: Mutex::new(SymbolFilters::new(dec!(0.1), dec!(0.001))),
            filter_queries: AtomicU64::new(0),
        }
    }
}

impl MockExecutor {
    fn place_count(&self) -> usize {
        self.places.lock().unwrap().len()
    }

    fn place(&self, index: usize) -> PlaceOrder {
        self.places.lock().unwrap()[index].clone()
    }

    fn last_place(&self) -> PlaceOrder {
        self.places.lock().unwrap().last().cloned().expect("no placements")
    }

    fn cancel_count(&self) -> usize {
        self.cancels.lock().unwrap().len()
    }

    fn fail_next_place(&self, err: ExecutorError) {
        self.scripted_failures.lock().unwrap().push_back(err);
    }

    /// What the venue reports on the next filter fetch.
    fn set_filters(&self, filters: SymbolFilters) {
        *self.filters.lock().unwrap() = filters;
    }

    fn filter_query_count(&self) -> u64 {
        self.filter_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VenueExecutor for MockExecutor {
    async fn place_order(&self, req: PlaceOrder) -> Result<OrderAck, ExecutorError> {
        if let Some(err) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let client_id = req.client_id.clone();
        self.places.lock().unwrap().push(req);
        Ok(OrderAck {
            order_id: format!("M{}", id),
            client_id: Some(client_id),
            status: OrderStatus::New,
            filled_qty: None,
            avg_price: None,
            ts: Utc::now(),
        })
    }

    async fn cancel_order(&self, req: CancelOrder) -> Result<OrderAck, ExecutorError> {
        let order_id = req.order_id.clone().unwrap_or_default();
        self.cancels.lock().unwrap().push(req);
        Ok(OrderAck {
            order_id,
            client_id: None,
            status: OrderStatus::Canceled,
            filled_qty: None,
            avg_price: None,
            ts: Utc::now(),
        })
    }

    async fn query_order(
        &self,
        _venue: Venue,
        _symbol: &str,
        order_id: &str,
    ) -> Result<OrderAck, ExecutorError> {
        Ok(OrderAck {
            order_id: order_id.to_string(),
            client_id: None,
            status: OrderStatus::New,
            filled_qty: None,
            avg_price: None,
            ts: Utc::now(),
        })
    }

    async fn symbol_filters(
        &self,
        _venue: Venue,
        _symbol: &str,
    ) -> Result<SymbolFilters, ExecutorError> {
        self.filter_queries.fetch_add(1, Ordering::SeqCst);
        Ok(*self.filters.lock().unwrap())
    }
}

fn zero_fees() -> FeeSchedule {
    FeeSchedule {
        cex_maker_fee: Decimal::ZERO,
        cex_taker_fee: Decimal::ZERO,
        dex_maker_fee: Decimal::ZERO,
        dex_taker_fee: Decimal::ZERO,
    }
}

fn board(fees: FeeSchedule) -> Arc<PriceBoard> {
    // Generous quote age so test timing never expires quotes.
    let trading = TradingConfig {
        max_quote_age_ms: 600_000,
        ..Default::default()
    };
    Arc::new(PriceBoard::new(fees, &trading))
}

struct Harness {
    strategy: StrategyHandle<MockExecutor>,
    executor: Arc<MockExecutor>,
    board: Arc<PriceBoard>,
}

fn harness(
    fees: FeeSchedule,
    cycle_qty: Decimal,
    threshold: Decimal,
    initial: InitialPosition,
) -> Harness {
    let executor = Arc::new(MockExecutor::default());
    let board = board(fees);
    let cfg = StrategyConfig {
        cex_symbol: "BTCUSDT".to_string(),
        dex_symbol: "BTC".to_string(),
        cycle_qty,
        min_spread_threshold: threshold,
        t_order: Duration::from_secs(5),
        t_cancel: Duration::from_secs(5),
        n_cancel_retry: 3,
        chase_limit_attempts: 3,
        cex_filters: SymbolFilters::new(dec!(0.1), dec!(0.001)),
        dex_filters: SymbolFilters::new(dec!(0.1), dec!(0.001)),
    };
    let machine = StrategyMachine::new(cfg, Arc::clone(&executor), Arc::clone(&board), initial);
    Harness {
        strategy: StrategyHandle::new(machine),
        executor,
        board,
    }
}

fn set_quotes(board: &PriceBoard, cex: (Decimal, Decimal), dex: (Decimal, Decimal)) {
    board.update(Venue::Binance, cex.0, cex.1).unwrap();
    board.update(Venue::Hyperliquid, dex.0, dex.1).unwrap();
}

fn after(secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(secs)
}

// ==================== S1: happy open ====================

#[tokio::test]
async fn happy_open_cycle() {
    let h = harness(
        FeeSchedule::default(),
        dec!(0.01),
        Decimal::ZERO,
        InitialPosition::Flat,
    );
    // S1 numbers: cex_ask=30000, dex_bid=30020 with default fees leaves
    // roughly +14 of edge.
    set_quotes(&h.board, (dec!(29998), dec!(30000)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);
    let leg1 = h.executor.place(0);
    assert_eq!(leg1.venue, Venue::Hyperliquid);
    assert_eq!(leg1.side, Side::Buy);
    assert_eq!(leg1.qty, dec!(0.01));
    // Maker price pinned at the DEX bid at placement.
    assert_eq!(leg1.price, Some(dec!(30020)));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Waiting);
    let leg2 = h.executor.place(1);
    assert_eq!(leg2.venue, Venue::Binance);
    assert_eq!(leg2.side, Side::Sell);
    assert_eq!(leg2.qty, dec!(0.01));
    // Taker sell hits the CEX bid.
    assert_eq!(leg2.price, Some(dec!(29998)));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.01));
    assert_eq!(h.executor.place_count(), 2);
}

// ==================== S2: leg1 timeout with partial ====================

#[tokio::test]
async fn leg1_timeout_with_partial_fill() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);

    // 5 s pass with no fill; the timer cancels.
    h.strategy.on_timer_tick(after(6)).await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Canceling);
    assert_eq!(h.executor.cancel_count(), 1);

    // Cancel ack reports a 0.004 partial; hedge exactly that.
    h.strategy
        .on_order_event(OrderEvent::partial_filled_canceled(
            Venue::Hyperliquid,
            "M1",
            dec!(0.004),
        ))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Waiting);
    let hedge = h.executor.last_place();
    assert_eq!(hedge.venue, Venue::Binance);
    assert_eq!(hedge.qty, dec!(0.004));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.004)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.004));
}

// ==================== S3: leg2 chase to market ====================

#[tokio::test]
async fn leg2_chase_escalates_to_market() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    // Attempt 1: limit at the bid.
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Waiting);
    assert_eq!(h.executor.place(1).price, Some(dec!(30000)));

    // Timeout, cancel, 0.003 filled; book moved down.
    h.strategy.on_timer_tick(after(6)).await;
    assert_eq!(h.executor.cancel_count(), 1);
    h.board.update(Venue::Binance, dec!(29998), dec!(29999)).unwrap();
    h.strategy
        .on_order_event(OrderEvent::partial_filled_canceled(
            Venue::Binance,
            "M2",
            dec!(0.003),
        ))
        .await;
    // Attempt 2: reposted at the refreshed bid for the remainder.
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Chasing);
    let repost = h.executor.place(2);
    assert_eq!(repost.qty, dec!(0.007));
    assert_eq!(repost.price, Some(dec!(29998)));

    // Attempt 2 fills 0.003 more and is canceled.
    h.strategy
        .on_order_event(OrderEvent::partial_filled_canceled(
            Venue::Binance,
            "M3",
            dec!(0.003),
        ))
        .await;
    // Attempt 3: last limit repost.
    let third = h.executor.place(3);
    assert_eq!(third.qty, dec!(0.004));
    assert!(third.price.is_some());

    // Attempt 3 dies with no fill; attempt 4 must be a market order.
    h.strategy
        .on_order_event(OrderEvent::all_canceled(Venue::Binance, "M4"))
        .await;
    let market = h.executor.place(4);
    assert_eq!(market.qty, dec!(0.004));
    assert_eq!(market.price, None);

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M5", dec!(0.004)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.01));
}

// ==================== S4: cancel race lost ====================

#[tokio::test]
async fn cancel_race_lost_to_fill() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    h.strategy.on_timer_tick(after(6)).await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Canceling);

    // The fill beats our cancel: handled exactly like a fill while
    // waiting.
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Waiting);
    assert_eq!(h.executor.place_count(), 2);

    // The late cancel ack no longer matches any live order.
    h.strategy
        .on_order_event(OrderEvent::all_canceled(Venue::Hyperliquid, "M1"))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Waiting);
    assert_eq!(h.executor.place_count(), 2);
}

// ==================== S6 + boundary: signal strictly above threshold ====================

#[tokio::test]
async fn zero_edge_never_fires() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    // open_edge = dex_bid - cex_ask = 0 exactly.
    set_quotes(&h.board, (dec!(29999), dec!(30000)), (dec!(30000), dec!(30001)));

    for _ in 0..5 {
        h.strategy.on_signal_tick().await;
        h.strategy.on_timer_tick(Instant::now()).await;
    }
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);
    assert_eq!(h.executor.place_count(), 0);

    // One tick above zero fires.
    h.board.update(Venue::Hyperliquid, dec!(30000.1), dec!(30001)).unwrap();
    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);
}

// ==================== rounding abort ====================

#[tokio::test]
async fn zero_qty_after_rounding_aborts_cycle() {
    // cycle_qty below one lot rounds to zero: no placement, stay idle.
    let h = harness(zero_fees(), dec!(0.0004), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);
    assert_eq!(h.executor.place_count(), 0);
}

// ==================== idempotent replay ====================

#[tokio::test]
async fn terminal_event_replay_is_noop() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    let held = h.strategy.ledger().await.held_qty;
    let places = h.executor.place_count();

    // Reconnect replay delivers both terminal events again.
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.ledger().await.held_qty, held);
    assert_eq!(h.executor.place_count(), places);
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
}

// ==================== open/close round trip ====================

#[tokio::test]
async fn open_close_round_trip_returns_flat() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);

    // Open leg: DEX bid rich against CEX ask.
    set_quotes(&h.board, (dec!(29999), dec!(30000)), (dec!(30020), dec!(30021)));
    h.strategy.on_signal_tick().await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.01));

    // Close leg: CEX bid rich against DEX ask.
    set_quotes(&h.board, (dec!(30050), dec!(30051)), (dec!(30000), dec!(30001)));
    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseLeg1Waiting);
    let close_leg1 = h.executor.place(2);
    assert_eq!(close_leg1.venue, Venue::Hyperliquid);
    assert_eq!(close_leg1.side, Side::Sell);
    // Maker sell rests at the DEX ask.
    assert_eq!(close_leg1.price, Some(dec!(30001)));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M3", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseLeg2Waiting);
    let close_leg2 = h.executor.place(3);
    assert_eq!(close_leg2.side, Side::Buy);
    // Taker buy lifts the CEX ask.
    assert_eq!(close_leg2.price, Some(dec!(30051)));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M4", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, Decimal::ZERO);
}

// ==================== partial close leaves residual ====================

#[tokio::test]
async fn partial_close_keeps_close_condition() {
    let h = harness(
        zero_fees(),
        dec!(0.01),
        Decimal::ZERO,
        InitialPosition::Hedged { qty: dec!(0.01) },
    );
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    set_quotes(&h.board, (dec!(30050), dec!(30051)), (dec!(30000), dec!(30001)));

    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseLeg1Waiting);
    // Close leg1 works the full held quantity.
    assert_eq!(h.executor.place(0).qty, dec!(0.01));

    // Timeout with only 0.004 sold on the DEX.
    h.strategy.on_timer_tick(after(6)).await;
    h.strategy
        .on_order_event(OrderEvent::partial_filled_canceled(
            Venue::Hyperliquid,
            "M1",
            dec!(0.004),
        ))
        .await;
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.004)))
        .await;

    // Residual 0.006 still hedged: keep scanning for a close.
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.006));
}

// ==================== unknown events are dropped ====================

#[tokio::test]
async fn unknown_order_events_are_dropped() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    // Replayed event with no active order at all.
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "STALE", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);

    h.strategy.on_signal_tick().await;
    // Event for some other order id while one is live.
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "STALE", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);
    assert_eq!(h.executor.place_count(), 1);
}

// ==================== leg1 placement failure stays idle ====================

#[tokio::test]
async fn leg1_placement_failure_stays_in_condition() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.executor.fail_next_place(ExecutorError::Transport {
        venue: Venue::Hyperliquid,
        msg: "connection reset".to_string(),
    });
    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);

    // The next tick with the signal still on retries cleanly.
    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);
}

// ==================== leg2 transport failure retried by timer ====================

#[tokio::test]
async fn leg2_transport_failure_retried_on_tick() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    h.executor.fail_next_place(ExecutorError::Transport {
        venue: Venue::Binance,
        msg: "HTTP 503".to_string(),
    });
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    // Placement failed; the machine stays in the leg2 phase with no
    // live order and the timer retries.
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Chasing);
    assert_eq!(h.executor.place_count(), 1);

    h.strategy.on_timer_tick(Instant::now()).await;
    assert_eq!(h.executor.place_count(), 2);
    let retry = h.executor.last_place();
    assert_eq!(retry.venue, Venue::Binance);
    assert_eq!(retry.qty, dec!(0.01));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
}

// ==================== filter rejects re-fetch precision ====================

#[tokio::test]
async fn leg1_filter_reject_refreshes_filters() {
    // 0.015 rounds to 0.015 with the configured 0.001 lot, but the
    // venue has since coarsened its lot to 0.01.
    let h = harness(zero_fees(), dec!(0.015), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));
    h.executor.set_filters(SymbolFilters::new(dec!(0.1), dec!(0.01)));
    h.executor.fail_next_place(ExecutorError::Rejected {
        venue: Venue::Hyperliquid,
        msg: "Price must be divisible by tick size.".to_string(),
    });

    h.strategy.on_signal_tick().await;
    // Reject left us idle and triggered a filter re-fetch.
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);
    assert_eq!(h.executor.filter_query_count(), 1);

    // The next signal rounds with the refreshed lot size.
    h.strategy.on_signal_tick().await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Waiting);
    assert_eq!(h.executor.last_place().qty, dec!(0.01));
}

#[tokio::test]
async fn leg2_filter_reject_refreshes_and_reposts() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    // The venue's tick differs from our cached 0.1.
    h.executor.set_filters(SymbolFilters::new(dec!(0.5), dec!(0.001)));
    h.executor.fail_next_place(ExecutorError::Rejected {
        venue: Venue::Binance,
        msg: "code -1013: Filter failure: PRICE_FILTER".to_string(),
    });
    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Hyperliquid, "M1", dec!(0.01)))
        .await;
    // Not an abort: filters changed, so the hedge is reposted instead.
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg2Chasing);
    assert_eq!(h.executor.filter_query_count(), 1);
    assert_eq!(h.executor.place_count(), 1);

    h.strategy.on_timer_tick(Instant::now()).await;
    let repost = h.executor.last_place();
    assert_eq!(repost.venue, Venue::Binance);
    assert_eq!(repost.qty, dec!(0.01));
    assert_eq!(repost.price, Some(dec!(30000)));

    h.strategy
        .on_order_event(OrderEvent::all_traded(Venue::Binance, "M2", dec!(0.01)))
        .await;
    assert_eq!(h.strategy.state().await, StrategyState::CloseCondition);
    assert_eq!(h.strategy.ledger().await.held_qty, dec!(0.01));
}

// ==================== cancel ack timeout aborts ====================

#[tokio::test]
async fn unacknowledged_cancel_aborts_to_condition() {
    let h = harness(zero_fees(), dec!(0.01), Decimal::ZERO, InitialPosition::Flat);
    set_quotes(&h.board, (dec!(30000), dec!(30000.5)), (dec!(30020), dec!(30021)));

    h.strategy.on_signal_tick().await;
    // Order times out; cancel goes out.
    h.strategy.on_timer_tick(after(6)).await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Canceling);
    assert_eq!(h.executor.cancel_count(), 1);

    // No ack ever arrives: three retries, then abort.
    h.strategy.on_timer_tick(after(12)).await;
    h.strategy.on_timer_tick(after(18)).await;
    h.strategy.on_timer_tick(after(24)).await;
    assert_eq!(h.executor.cancel_count(), 4);
    assert_eq!(h.strategy.state().await, StrategyState::OpenLeg1Canceling);

    h.strategy.on_timer_tick(after(30)).await;
    assert_eq!(h.strategy.state().await, StrategyState::OpenCondition);
}
