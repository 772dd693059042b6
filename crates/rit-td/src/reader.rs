//! Market data and session clock readers.
//!
//! Thin wrappers that fetch an upstream record through an [`Exchange`] and
//! validate it into the snapshot the algorithm consumes. Each call either
//! yields a snapshot or an explicit error; there is no cached fallback.

use anyhow::Result;
use rit_core::market_data::{BookSnapshot, PositionSnapshot, SessionStatus};
use tracing::debug;

use crate::Exchange;

/// Best bid/offer with consolidated size at each best price.
pub async fn read_book<E: Exchange + ?Sized>(exchange: &E, ticker: &str) -> Result<BookSnapshot> {
    let book = exchange.get_book(ticker).await?;
    let snap = BookSnapshot::from_book(&book)?;
    debug!("[reader] {ticker} {snap}");
    Ok(snap)
}

/// Own position and cumulative market volume.
pub async fn read_position<E: Exchange + ?Sized>(
    exchange: &E,
    ticker: &str,
) -> Result<PositionSnapshot> {
    let securities = exchange.get_securities(ticker).await?;
    let snap = PositionSnapshot::from_securities(ticker, &securities)?;
    debug!("[reader] {ticker} position={} volume={}", snap.position, snap.market_volume);
    Ok(snap)
}

/// Session state and progress fraction.
pub async fn read_status<E: Exchange + ?Sized>(exchange: &E) -> Result<SessionStatus> {
    let case = exchange.get_case().await?;
    let status = SessionStatus::from_case(&case)?;
    debug!("[reader] session {status}");
    Ok(status)
}
