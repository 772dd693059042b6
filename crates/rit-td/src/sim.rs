//! In-memory simulated exchange for paper runs and tests.
//!
//! Models a single ticker with a price-time priority book, a tick clock, and a
//! steady flow of market orders from other traders:
//!
//! - The book starts with a ladder of resting orders owned by other traders.
//! - A limit order that reaches the opposite best price fills immediately,
//!   level by level, and any remainder rests.
//! - The clock runs on tokio time, one tick per `tick_ms`, and is brought up
//!   to date lazily at the start of every call. Each tick prints market volume
//!   and sends one market order into each side of the book, which can fill
//!   this trader's resting orders.
//! - The session stops once the tick reaches `ticks_per_period`.
//! - Cancel-all removes only this trader's resting orders.
//!
//! Failures can be injected per endpoint with [`SimExchange::fail_next`].
//! Under a paused tokio clock (`start_paused = true`) the whole market is
//! deterministic.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rit_core::config::SimConfig;
use rit_core::enums::{BookSide, SessionState, Side};
use rit_core::error::RitError;
use rit_core::market_data::{BookLevel, Case, OrderBook, Security};
use rit_core::trading::OrderIntent;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Trader ID stamped on orders submitted through this exchange.
pub const SELF_TRADER_ID: &str = "SELF";

/// Trader ID of the ladder and market-flow participants.
pub const MARKET_TRADER_ID: &str = "MARKET";

/// Endpoints that accept injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimEndpoint {
    Case,
    Book,
    Securities,
    Order,
    Cancel,
}

impl SimEndpoint {
    fn path(self) -> &'static str {
        match self {
            Self::Case => "/case",
            Self::Book => "/securities/book",
            Self::Securities => "/securities",
            Self::Order => "/orders",
            Self::Cancel => "/commands/cancel",
        }
    }
}

/// A resting order.
#[derive(Debug, Clone)]
struct Resting {
    order_id: u64,
    trader_id: String,
    price: f64,
    quantity: f64,
    filled: f64,
}

impl Resting {
    fn open(&self) -> f64 {
        self.quantity - self.filled
    }

    fn is_own(&self) -> bool {
        self.trader_id == SELF_TRADER_ID
    }
}

/// Mutable market state behind the exchange lock.
#[derive(Debug)]
struct SimState {
    tick: u32,
    state: SessionState,
    /// Start of the current, not yet elapsed tick.
    tick_started: Instant,
    /// Case queries left before a pending session turns ACTIVE.
    polls_until_start: Option<u32>,
    /// Best (highest) price first; FIFO within a price.
    bids: Vec<Resting>,
    /// Best (lowest) price first; FIFO within a price.
    asks: Vec<Resting>,
    position: f64,
    volume: f64,
    next_order_id: u64,
    /// Remaining injected failures per endpoint.
    failures: HashMap<SimEndpoint, u32>,
}

/// Simulated single-ticker exchange.
pub struct SimExchange {
    ticker: String,
    config: SimConfig,
    state: Mutex<SimState>,
}

impl SimExchange {
    /// Create an ACTIVE session at tick 0 with the seeded ladder.
    pub fn new(ticker: impl Into<String>, config: SimConfig) -> Self {
        let mut state = SimState {
            tick: 0,
            state: SessionState::Active,
            tick_started: Instant::now(),
            polls_until_start: None,
            bids: Vec::new(),
            asks: Vec::new(),
            position: 0.0,
            volume: 0.0,
            next_order_id: 1,
            failures: HashMap::new(),
        };
        replenish_ladder(&mut state, &config);

        Self { ticker: ticker.into(), config, state: Mutex::new(state) }
    }

    /// Hold the session in PENDING for `polls` case queries, then turn ACTIVE.
    ///
    /// `None` keeps it pending forever.
    pub async fn start_after(&self, polls: Option<u32>) {
        let mut st = self.state.lock().await;
        st.state = SessionState::Pending;
        st.polls_until_start = polls;
    }

    /// Force the session state (e.g. pause or stop mid-run).
    pub async fn set_state(&self, state: SessionState) {
        self.state.lock().await.state = state;
    }

    /// Make the next call to `endpoint` fail with HTTP 500.
    pub async fn fail_next(&self, endpoint: SimEndpoint) {
        self.fail_times(endpoint, 1).await;
    }

    /// Make the next `times` calls to `endpoint` fail with HTTP 500.
    pub async fn fail_times(&self, endpoint: SimEndpoint, times: u32) {
        *self.state.lock().await.failures.entry(endpoint).or_insert(0) += times;
    }

    /// Remove every resting order on one side (to produce a one-sided book).
    pub async fn clear_side(&self, side: BookSide) {
        let mut st = self.state.lock().await;
        match side {
            BookSide::Bid => st.bids.clear(),
            BookSide::Ask => st.asks.clear(),
        }
    }

    /// Set this trader's held position directly.
    pub async fn set_position(&self, position: f64) {
        self.state.lock().await.position = position;
    }

    /// This trader's held position.
    pub async fn position(&self) -> f64 {
        self.state.lock().await.position
    }

    /// Cumulative market volume.
    pub async fn volume(&self) -> f64 {
        self.state.lock().await.volume
    }

    fn check_ticker(&self, ticker: &str) -> Result<(), RitError> {
        if ticker == self.ticker {
            Ok(())
        } else {
            Err(RitError::UnknownTicker(ticker.to_string()))
        }
    }

    /// Consume an injected failure for `endpoint`, if any.
    fn take_failure(st: &mut SimState, endpoint: SimEndpoint) -> Result<(), RitError> {
        match st.failures.get_mut(&endpoint) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(RitError::Http { endpoint: endpoint.path().to_string(), status: 500 })
            }
            _ => Ok(()),
        }
    }

    /// Run every tick that has fully elapsed since the last call.
    fn catch_up(&self, st: &mut SimState) {
        let tick_len = Duration::from_millis(self.config.tick_ms);
        let now = Instant::now();
        if st.state != SessionState::Active {
            st.tick_started = now;
            return;
        }
        while st.state == SessionState::Active && now.duration_since(st.tick_started) >= tick_len {
            st.tick_started += tick_len;
            self.step(st);
        }
    }

    /// Advance one tick: print background volume and run market flow.
    ///
    /// Flow fills count toward market volume like any other trade.
    fn step(&self, st: &mut SimState) {
        st.tick += 1;
        st.volume += self.config.volume_per_tick;

        // Sell flow hits bids, buy flow lifts asks.
        let sold = sweep(&mut st.bids, self.config.flow_per_tick, None, Side::Sell);
        let bought = sweep(&mut st.asks, self.config.flow_per_tick, None, Side::Buy);
        st.position += sold.own - bought.own;
        st.volume += sold.total + bought.total;
        replenish_ladder(st, &self.config);

        if st.tick >= self.config.ticks_per_period {
            st.state = SessionState::Stopped;
            info!("[sim] session stopped at tick {}", st.tick);
        }
    }
}

/// Quantities taken out of the book by one sweep.
#[derive(Debug, Default)]
struct Swept {
    total: f64,
    own: f64,
}

/// Fill up to `quantity` against `levels` from the best price down.
///
/// With `limit`, only levels at or better than the limit are taken: a buy
/// (`aggressor == Buy`) takes asks priced `<= limit`, a sell takes bids `>= limit`.
fn sweep(levels: &mut Vec<Resting>, quantity: f64, limit: Option<f64>, aggressor: Side) -> Swept {
    let mut out = Swept::default();
    let mut remaining = quantity;

    for level in levels.iter_mut() {
        if remaining <= 0.0 {
            break;
        }
        let crosses = match (limit, aggressor) {
            (None, _) => true,
            (Some(px), Side::Buy) => level.price <= px,
            (Some(px), Side::Sell) => level.price >= px,
        };
        if !crosses {
            break;
        }
        let take = remaining.min(level.open());
        level.filled += take;
        remaining -= take;
        out.total += take;
        if level.is_own() {
            out.own += take;
        }
    }

    levels.retain(|l| l.open() > 0.0);
    out
}

/// Insert keeping price priority (best first) and time priority within a price.
fn insert_resting(levels: &mut Vec<Resting>, order: Resting, side: Side) {
    let idx = levels
        .iter()
        .position(|l| match side {
            Side::Buy => l.price < order.price,
            Side::Sell => l.price > order.price,
        })
        .unwrap_or(levels.len());
    levels.insert(idx, order);
}

/// Top up the market-owned ladder so every configured price has a resting order.
fn replenish_ladder(st: &mut SimState, config: &SimConfig) {
    for i in 0..config.levels {
        let offset = config.price_step * i as f64;
        for (side, price) in [(Side::Buy, config.bid - offset), (Side::Sell, config.ask + offset)] {
            let price = round_cents(price);
            let levels = match side {
                Side::Buy => &mut st.bids,
                Side::Sell => &mut st.asks,
            };
            let present = levels.iter().any(|l| !l.is_own() && l.price == price);
            if !present {
                let order = Resting {
                    order_id: st.next_order_id,
                    trader_id: MARKET_TRADER_ID.to_string(),
                    price,
                    quantity: config.level_size,
                    filled: 0.0,
                };
                st.next_order_id += 1;
                insert_resting(levels, order, side);
            }
        }
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

fn to_level(r: &Resting) -> BookLevel {
    BookLevel {
        order_id: r.order_id,
        trader_id: r.trader_id.clone(),
        price: r.price,
        quantity: r.quantity,
        quantity_filled: r.filled,
    }
}

#[async_trait]
impl crate::Exchange for SimExchange {
    fn name(&self) -> &str {
        "sim"
    }

    async fn get_case(&self) -> Result<Case> {
        let mut st = self.state.lock().await;
        Self::take_failure(&mut st, SimEndpoint::Case)?;
        self.catch_up(&mut st);

        if st.state == SessionState::Pending {
            if let Some(left) = st.polls_until_start {
                if left <= 1 {
                    st.state = SessionState::Active;
                    st.polls_until_start = None;
                    st.tick_started = Instant::now();
                    info!("[sim] session started");
                } else {
                    st.polls_until_start = Some(left - 1);
                }
            }
        }

        Ok(Case { tick: st.tick, ticks_per_period: self.config.ticks_per_period, status: st.state })
    }

    async fn get_book(&self, ticker: &str) -> Result<OrderBook> {
        let mut st = self.state.lock().await;
        Self::take_failure(&mut st, SimEndpoint::Book)?;
        self.catch_up(&mut st);
        self.check_ticker(ticker)?;

        Ok(OrderBook {
            bids: st.bids.iter().map(to_level).collect(),
            asks: st.asks.iter().map(to_level).collect(),
        })
    }

    async fn get_securities(&self, ticker: &str) -> Result<Vec<Security>> {
        let mut st = self.state.lock().await;
        Self::take_failure(&mut st, SimEndpoint::Securities)?;
        self.catch_up(&mut st);

        if ticker != self.ticker {
            return Ok(Vec::new());
        }
        Ok(vec![Security { ticker: self.ticker.clone(), position: st.position, volume: st.volume }])
    }

    async fn insert_order(&self, order: &OrderIntent) -> Result<u64> {
        let mut st = self.state.lock().await;
        Self::take_failure(&mut st, SimEndpoint::Order)?;
        self.catch_up(&mut st);
        self.check_ticker(&order.ticker)?;

        if order.quantity == 0 {
            return Err(RitError::Trading("quantity must be positive".into()).into());
        }
        if !(order.price.is_finite() && order.price > 0.0) {
            return Err(RitError::Trading(format!("invalid limit price {}", order.price)).into());
        }
        if st.state != SessionState::Active {
            return Err(RitError::Trading(format!("session is {}", st.state)).into());
        }

        let order_id = st.next_order_id;
        st.next_order_id += 1;

        let quantity = order.quantity as f64;
        let swept = match order.side {
            Side::Buy => sweep(&mut st.asks, quantity, Some(order.price), Side::Buy),
            Side::Sell => sweep(&mut st.bids, quantity, Some(order.price), Side::Sell),
        };

        // Fills against our own resting orders net to zero.
        let net = swept.total - swept.own;
        match order.side {
            Side::Buy => st.position += net,
            Side::Sell => st.position -= net,
        }
        st.volume += swept.total;

        let rest = quantity - swept.total;
        if rest > 0.0 {
            let resting = Resting {
                order_id,
                trader_id: SELF_TRADER_ID.to_string(),
                price: order.price,
                quantity: rest,
                filled: 0.0,
            };
            match order.side {
                Side::Buy => insert_resting(&mut st.bids, resting, Side::Buy),
                Side::Sell => insert_resting(&mut st.asks, resting, Side::Sell),
            }
        }

        debug!("[sim] order {order_id}: {order} filled={} resting={rest}", swept.total);
        Ok(order_id)
    }

    async fn cancel_all_orders(&self, ticker: &str) -> Result<()> {
        let mut st = self.state.lock().await;
        Self::take_failure(&mut st, SimEndpoint::Cancel)?;
        self.catch_up(&mut st);
        self.check_ticker(ticker)?;

        let before = st.bids.len() + st.asks.len();
        st.bids.retain(|l| !l.is_own());
        st.asks.retain(|l| !l.is_own());
        let cancelled = before - st.bids.len() - st.asks.len();
        debug!("[sim] cancelled {cancelled} order(s) in {ticker}");
        Ok(())
    }
}
