//! # rit-td
//!
//! Trading and market data access for the RIT client API.
//!
//! Every venue implements the [`Exchange`] trait, which mirrors the five
//! upstream calls the execution loop needs. The [`reader`] module turns the
//! raw records into validated snapshots.
//!
//! ## Implementations
//!
//! | Venue            | Module | Transport               |
//! |------------------|--------|-------------------------|
//! | RIT client API   | `rit`  | REST (reqwest)          |
//! | Simulated market | `sim`  | in-memory, for paper runs and tests |

pub mod reader;
pub mod rit;
pub mod sim;

use anyhow::Result;
use async_trait::async_trait;
use rit_core::market_data::{Case, OrderBook, Security};
use rit_core::trading::OrderIntent;

/// Trait implemented by all exchange connections.
///
/// Methods return the upstream records as-is; validation happens in
/// [`reader`]. A non-success response is always an `Err`, never an empty
/// value. All methods take `&self`.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Human-readable venue name for log lines.
    fn name(&self) -> &str;

    /// Session record (`GET /case`).
    async fn get_case(&self) -> Result<Case>;

    /// Full order book for one ticker (`GET /securities/book`).
    async fn get_book(&self, ticker: &str) -> Result<OrderBook>;

    /// Securities listing filtered to one ticker (`GET /securities`).
    async fn get_securities(&self, ticker: &str) -> Result<Vec<Security>>;

    /// Submit a limit order (`POST /orders`).
    ///
    /// Returns the exchange-assigned order ID on success.
    async fn insert_order(&self, order: &OrderIntent) -> Result<u64>;

    /// Cancel every open order this trader has in `ticker` (`POST /commands/cancel`).
    async fn cancel_all_orders(&self, ticker: &str) -> Result<()>;
}
