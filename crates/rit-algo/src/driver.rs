//! Order lifecycle driver — the execution loop.
//!
//! # State machine
//!
//! ```text
//! AwaitingStart ──ACTIVE──▶ Running ──target reached──▶ Done
//!       │                    │  ▲
//!   polls exhausted          │  └── cycle ok / cycle skipped (budget left)
//!       ▼                    ├──── session not ACTIVE ──▶ Stopped
//!   NeverStarted             └──── budget exhausted ───▶ Aborted
//! ```
//!
//! One `Running` step is a cycle: read position and book, size, submit the
//! active then the passive order(s), wait `fill_wait`, cancel everything still
//! open in the ticker, then re-read the session status. Everything runs on one
//! task; a cycle finishes (including its cancel) before the next one starts.
//!
//! Any error inside a cycle is caught here, logged, and turned into a skipped
//! cycle with backoff (see [`RetryBudget`]). Orders that may still be resting
//! after a failed cycle are cancelled best-effort.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rit_core::config::AlgoConfig;
use rit_core::enums::SessionState;
use rit_core::error::RitError;
use rit_core::market_data::SessionStatus;
use rit_core::trading::ExecutionTarget;
use rit_td::Exchange;
use rit_td::reader::{read_book, read_position, read_status};
use tracing::{debug, error, info, warn};

use crate::retry::{Backoff, RetryBudget};
use crate::sizing::{Sizing, size};

/// Immutable driver settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub ticker: String,
    pub target: ExecutionTarget,
    /// Re-polls after the initial status check.
    pub start_poll_attempts: u32,
    pub start_poll_interval: Duration,
    pub fill_wait: Duration,
    pub max_order_size: Option<u64>,
    pub max_consecutive_failures: u32,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl From<&AlgoConfig> for DriverConfig {
    fn from(cfg: &AlgoConfig) -> Self {
        Self {
            ticker: cfg.ticker.clone(),
            target: cfg.target(),
            start_poll_attempts: cfg.start_poll_attempts,
            start_poll_interval: Duration::from_millis(cfg.start_poll_interval_ms),
            fill_wait: Duration::from_millis(cfg.fill_wait_ms),
            max_order_size: cfg.max_order_size,
            max_consecutive_failures: cfg.max_consecutive_failures,
            backoff_initial: Duration::from_millis(cfg.backoff_initial_ms),
            backoff_max: Duration::from_millis(cfg.backoff_max_ms),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The session never became ACTIVE within the poll budget; nothing traded.
    NeverStarted,
    /// Position reached the target.
    TargetReached,
    /// The session left ACTIVE (paused or stopped) before the target was reached.
    SessionEnded(SessionState),
    /// Too many consecutive failed cycles.
    Aborted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeverStarted => f.write_str("session never started"),
            Self::TargetReached => f.write_str("target reached"),
            Self::SessionEnded(state) => write!(f, "session ended ({state})"),
            Self::Aborted => f.write_str("aborted after repeated failures"),
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Cycles started (including skipped ones).
    pub cycles: u64,
    /// Failed cycles and failed status re-checks.
    pub failures: u64,
    /// Orders accepted by the exchange.
    pub orders_submitted: u64,
}

/// Outcome, counters, and the last known position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
    /// Position read after the loop exited, if the read succeeded.
    pub final_position: Option<f64>,
}

/// Internal loop states.
#[derive(Debug, Clone, Copy)]
enum DriverState {
    AwaitingStart,
    Running(SessionStatus),
    Done,
    Stopped(SessionState),
    Aborted,
}

/// Result of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    TargetReached,
    Traded { orders: usize },
}

/// Participation-rate execution driver for one ticker.
pub struct Driver {
    exchange: Arc<dyn Exchange>,
    config: DriverConfig,
    stats: RunStats,
    /// Set once an order is sent, cleared by a successful cancel-all.
    orders_outstanding: bool,
}

impl Driver {
    pub fn new(exchange: Arc<dyn Exchange>, config: DriverConfig) -> Self {
        Self { exchange, config, stats: RunStats::default(), orders_outstanding: false }
    }

    /// Run until the target is reached, the session ends, or the run gives up.
    pub async fn run(&mut self) -> RunReport {
        let mut budget = RetryBudget::new(
            self.config.max_consecutive_failures,
            Backoff::new(self.config.backoff_initial, self.config.backoff_max),
        );
        let mut state = DriverState::AwaitingStart;

        let outcome = loop {
            state = match state {
                DriverState::AwaitingStart => match self.await_start().await {
                    Some(status) => {
                        info!("[driver] session active ({status}), working {} to {}",
                            self.config.ticker, self.config.target.target_position);
                        DriverState::Running(status)
                    }
                    None => {
                        error!(
                            "[driver] session never started after {} status polls",
                            self.config.start_poll_attempts + 1
                        );
                        break RunOutcome::NeverStarted;
                    }
                },
                DriverState::Running(status) => self.step(status, &mut budget).await,
                DriverState::Done => break RunOutcome::TargetReached,
                DriverState::Stopped(s) => break RunOutcome::SessionEnded(s),
                DriverState::Aborted => break RunOutcome::Aborted,
            };
        };

        let final_position = match read_position(self.exchange.as_ref(), &self.config.ticker).await {
            Ok(p) => Some(p.position),
            Err(e) => {
                warn!("[driver] final position unavailable: {e:#}");
                None
            }
        };

        info!(
            "[driver] finished: {outcome} — cycles={} failures={} orders={} position={:?}",
            self.stats.cycles, self.stats.failures, self.stats.orders_submitted, final_position,
        );
        RunReport { outcome, stats: self.stats, final_position }
    }

    /// Poll the session once, then up to `start_poll_attempts` more times.
    async fn await_start(&self) -> Option<SessionStatus> {
        let attempts = self.config.start_poll_attempts;
        for attempt in 0..=attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.start_poll_interval).await;
            }
            match read_status(self.exchange.as_ref()).await {
                Ok(status) if status.is_active() => return Some(status),
                Ok(status) => debug!("[driver] waiting for start: {status} [{attempt}/{attempts}]"),
                Err(e) => warn!("[driver] session status unavailable: {e:#} [{attempt}/{attempts}]"),
            }
        }
        None
    }

    /// One `Running` step: a cycle followed by the status re-check.
    async fn step(&mut self, status: SessionStatus, budget: &mut RetryBudget) -> DriverState {
        self.stats.cycles += 1;

        match self.run_cycle(&status).await {
            Ok(CycleOutcome::TargetReached) => return DriverState::Done,
            Ok(CycleOutcome::Traded { orders }) => {
                debug!("[driver] cycle {} complete, {orders} order(s)", self.stats.cycles);
                budget.on_success();
            }
            Err(e) => {
                if let Some(next) = self.on_failure("cycle", e, budget).await {
                    return next;
                }
            }
        }

        match read_status(self.exchange.as_ref()).await {
            Ok(next) if next.is_active() => DriverState::Running(next),
            Ok(next) => {
                info!("[driver] session is {}, stopping", next.state);
                DriverState::Stopped(next.state)
            }
            Err(e) => match self.on_failure("status", e, budget).await {
                Some(next) => next,
                None => DriverState::Running(status),
            },
        }
    }

    /// Read → size → submit → wait → cancel.
    async fn run_cycle(&mut self, status: &SessionStatus) -> Result<CycleOutcome> {
        let ticker = self.config.ticker.as_str();
        let position = read_position(self.exchange.as_ref(), ticker).await?;
        let book = read_book(self.exchange.as_ref(), ticker).await?;

        let plan = match size(&self.config.target, &position, &book, status.progress) {
            Sizing::Done => {
                info!("[driver] position {} reached target", position.position);
                return Ok(CycleOutcome::TargetReached);
            }
            Sizing::Trade(plan) => plan,
        };

        info!(
            "[driver] tick {}/{} participation={:.3} remaining={:.0} size={:.1} \
             active={:.0}@{:.2} passive={:.1}@{:.2} {}",
            status.tick,
            status.ticks_per_period,
            plan.participation_cap,
            plan.remaining,
            plan.total_size,
            plan.active_qty,
            plan.active_price,
            plan.passive_qty,
            plan.passive_price,
            plan.side,
        );

        let intents = plan.intents(ticker, self.config.max_order_size);
        for intent in &intents {
            self.orders_outstanding = true;
            let order_id = self
                .exchange
                .insert_order(intent)
                .await
                .with_context(|| format!("submit {intent}"))?;
            self.stats.orders_submitted += 1;
            debug!("[driver] submitted {intent} → id={order_id}");
        }

        tokio::time::sleep(self.config.fill_wait).await;

        if self.orders_outstanding {
            self.exchange.cancel_all_orders(ticker).await.context("cancel-all")?;
            self.orders_outstanding = false;
        }

        Ok(CycleOutcome::Traded { orders: intents.len() })
    }

    /// Log a failure, pull any resting orders, and back off.
    ///
    /// Returns `Some(Aborted)` once the retry budget is spent.
    async fn on_failure(
        &mut self,
        stage: &str,
        err: anyhow::Error,
        budget: &mut RetryBudget,
    ) -> Option<DriverState> {
        self.stats.failures += 1;
        warn!(
            "[driver] {stage} skipped ({}): {err:#} [{}/{}]",
            failure_kind(&err),
            budget.consecutive() + 1,
            budget.max_failures(),
        );

        if self.orders_outstanding {
            match self.exchange.cancel_all_orders(&self.config.ticker).await {
                Ok(()) => self.orders_outstanding = false,
                Err(e) => warn!("[driver] cancel-all after failure also failed: {e:#}"),
            }
        }

        match budget.on_failure() {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                None
            }
            None => {
                error!("[driver] {} consecutive failures, giving up", budget.consecutive());
                Some(DriverState::Aborted)
            }
        }
    }
}

/// Log label for an error: the [`RitError`] kind if one is in the chain.
fn failure_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|e| e.downcast_ref::<RitError>())
        .map_or("transport", RitError::kind)
}
