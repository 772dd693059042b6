//! # rit-algo
//!
//! Participation-rate execution for a single RIT ticker.
//!
//! - [`sizing`] — pure per-cycle sizing and pricing
//! - [`driver`] — the await-start / trade / cancel / re-check loop
//! - [`retry`] — consecutive-failure budget with exponential backoff

pub mod driver;
pub mod retry;
pub mod sizing;

pub use driver::{Driver, DriverConfig, RunOutcome, RunReport, RunStats};
pub use sizing::{Sizing, SizingPlan, size};
