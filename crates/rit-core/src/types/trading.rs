//! Trading-related data structures — the execution target and order intents.
//!
//! These types flow from the sizing engine to the exchange seam in `rit-td`.

use serde::{Deserialize, Serialize};

use super::enums::{Side, Urgency};

// ---------------------------------------------------------------------------
// Execution target
// ---------------------------------------------------------------------------

/// What the run is trying to achieve. Fixed before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Signed target position (positive = end net long).
    pub target_position: i64,
    /// Expected total market volume for the session, used to normalize participation.
    pub expected_volume: f64,
}

// ---------------------------------------------------------------------------
// Order intent (algo → TD module)
// ---------------------------------------------------------------------------

/// A limit order the algorithm wants on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Instrument ticker (e.g. `"MC"`).
    pub ticker: String,
    /// Whole shares.
    pub quantity: u64,
    /// Buy or sell.
    pub side: Side,
    /// Limit price.
    pub price: f64,
    /// Whether the price crosses the spread or joins the queue.
    pub urgency: Urgency,
}

impl std::fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} x{} @ {:.2}",
            self.urgency, self.side, self.ticker, self.quantity, self.price
        )
    }
}
