//! Enumerations used throughout the RIT execution system.
//!
//! Wire spellings follow the RIT REST API (`"BUY"`, `"ACTIVE"`, ...), so the
//! serde representations double as the query-string values sent upstream.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Order side
// ---------------------------------------------------------------------------

/// Buy or sell direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side implied by the sign of a target position (`> 0` buys).
    pub fn from_target(target: i64) -> Self {
        if target > 0 { Self::Buy } else { Self::Sell }
    }

    /// The `action` value expected by `POST /orders`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Book side
// ---------------------------------------------------------------------------

/// One side of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl std::fmt::Display for BookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bid => f.write_str("bid"),
            Self::Ask => f.write_str("ask"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order urgency
// ---------------------------------------------------------------------------

/// How an order is priced relative to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    /// Priced at the opposite best so it crosses immediately.
    Active,
    /// Priced at the same-side best and left to queue.
    Passive,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Passive => f.write_str("passive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Case (session) state reported by `GET /case`.
///
/// Any status string the API adds later deserializes as [`SessionState::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    Active,
    Paused,
    Stopped,
    #[default]
    #[serde(other)]
    Pending,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Active => f.write_str("ACTIVE"),
            Self::Paused => f.write_str("PAUSED"),
            Self::Stopped => f.write_str("STOPPED"),
        }
    }
}
