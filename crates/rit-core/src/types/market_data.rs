//! Market data structures — upstream records and the snapshots derived from them.
//!
//! The `Case`, `OrderBook`, `BookLevel`, and `Security` structs mirror the JSON
//! returned by the RIT REST API. [`BookSnapshot`], [`PositionSnapshot`], and
//! [`SessionStatus`] are the validated, per-cycle views the algorithm consumes.
//! Each is rebuilt from a fresh upstream record every cycle.

use serde::{Deserialize, Serialize};

use super::enums::{BookSide, SessionState};
use crate::error::RitError;

// ---------------------------------------------------------------------------
// Upstream records
// ---------------------------------------------------------------------------

/// Session record from `GET /case`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub tick: u32,
    pub ticks_per_period: u32,
    pub status: SessionState,
}

/// A single resting order as listed by `GET /securities/book`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    #[serde(default)]
    pub order_id: u64,
    #[serde(default)]
    pub trader_id: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub quantity_filled: f64,
}

impl BookLevel {
    /// Unfilled size still resting on the book.
    #[inline]
    pub fn open_quantity(&self) -> f64 {
        self.quantity - self.quantity_filled
    }
}

/// Order book from `GET /securities/book`, best price first on each side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

/// Per-security record from `GET /securities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: String,
    pub position: f64,
    pub volume: f64,
}

// ---------------------------------------------------------------------------
// BookSnapshot
// ---------------------------------------------------------------------------

/// Best bid and offer with the open size consolidated at each best price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookSnapshot {
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_price: f64,
    pub ask_size: f64,
}

impl BookSnapshot {
    /// Build a snapshot from a raw book.
    ///
    /// Fails with [`RitError::MalformedBook`] when either side is empty and
    /// with [`RitError::Parse`] when the best bid is above the best ask.
    pub fn from_book(book: &OrderBook) -> Result<Self, RitError> {
        let (bid_price, bid_size) = best_level(&book.bids, BookSide::Bid)?;
        let (ask_price, ask_size) = best_level(&book.asks, BookSide::Ask)?;

        if bid_price > ask_price {
            return Err(RitError::Parse(format!("crossed book: bid {bid_price} > ask {ask_price}")));
        }

        Ok(Self { bid_price, bid_size, ask_price, ask_size })
    }
}

/// Best price on one side and the open size of every order at exactly that price.
fn best_level(levels: &[BookLevel], side: BookSide) -> Result<(f64, f64), RitError> {
    let best = levels.first().ok_or(RitError::MalformedBook(side))?.price;
    let size = levels
        .iter()
        .take_while(|l| l.price == best)
        .map(BookLevel::open_quantity)
        .sum();
    Ok((best, size))
}

impl std::fmt::Display for BookSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BBO(bid={:.2}x{:.0} ask={:.2}x{:.0})",
            self.bid_price, self.bid_size, self.ask_price, self.ask_size
        )
    }
}

// ---------------------------------------------------------------------------
// PositionSnapshot
// ---------------------------------------------------------------------------

/// Own position and cumulative market volume for one ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    /// Signed held quantity (positive = long).
    pub position: f64,
    /// Shares traded by the whole market since the session started.
    pub market_volume: f64,
}

impl PositionSnapshot {
    /// Pick the record for `ticker` out of a securities listing.
    pub fn from_securities(ticker: &str, securities: &[Security]) -> Result<Self, RitError> {
        let sec = securities
            .iter()
            .find(|s| s.ticker == ticker)
            .ok_or_else(|| RitError::UnknownTicker(ticker.to_string()))?;
        Ok(Self { position: sec.position, market_volume: sec.volume })
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Session state plus how far through the session the clock is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub tick: u32,
    pub ticks_per_period: u32,
    /// `tick / ticks_per_period`, clamped to `[0, 1]`.
    pub progress: f64,
}

impl SessionStatus {
    pub fn from_case(case: &Case) -> Result<Self, RitError> {
        if case.ticks_per_period == 0 {
            return Err(RitError::Parse("case reports ticks_per_period = 0".into()));
        }
        let progress = (f64::from(case.tick) / f64::from(case.ticks_per_period)).clamp(0.0, 1.0);
        Ok(Self {
            state: case.status,
            tick: case.tick,
            ticks_per_period: case.ticks_per_period,
            progress,
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tick={}/{} progress={:.3}",
            self.state, self.tick, self.ticks_per_period, self.progress
        )
    }
}
