//! Typed error definitions for the RIT execution system.
//!
//! Provides [`RitError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`. The
//! driver downcasts to [`RitError`] to decide how a failed cycle is reported.

use thiserror::Error;

use crate::types::enums::BookSide;

/// Domain-specific errors for the RIT execution system.
#[derive(Debug, Error)]
pub enum RitError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The upstream service answered with a non-success status.
    #[error("http error: {endpoint} returned {status}")]
    Http {
        /// Endpoint path that failed (e.g. `/securities/book`).
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// One side of the book is empty, so the best price is undefined.
    #[error("malformed book: no {0} levels")]
    MalformedBook(BookSide),

    /// The securities response did not contain the requested ticker.
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),

    /// Trading operation error (order placement, cancellation).
    #[error("trading error: {0}")]
    Trading(String),
}

impl RitError {
    /// Short label for log lines (`read`, `book`, `submit`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Http { .. } | Self::Parse(_) | Self::UnknownTicker(_) => "read",
            Self::MalformedBook(_) => "book",
            Self::Trading(_) => "submit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_side() {
        let err = RitError::MalformedBook(BookSide::Bid);
        assert_eq!(err.to_string(), "malformed book: no bid levels");
        assert_eq!(err.kind(), "book");
    }

    #[test]
    fn http_error_is_a_read_failure() {
        let err = RitError::Http { endpoint: "/case".into(), status: 503 };
        assert_eq!(err.kind(), "read");
        assert!(err.to_string().contains("503"));
    }
}
