//! Configuration parsing for the RIT execution system.
//!
//! The runner reads a single JSON config file. The top-level structure
//! contains logging metadata, the exchange connection, the algorithm
//! parameters, and (for `--paper` runs) the simulated market.
//!
//! # Example config
//!
//! ```json
//! {
//!   "module": { "module_name": "rit_algo", "log_path": "/tmp/log" },
//!   "exchange": { "base_url": "http://localhost:9999/v1", "api_key": "38M64LST" },
//!   "algo": { "ticker": "MC", "target_shares": 100000, "number_traders": 40 }
//! }
//! ```
//!
//! Every field except `exchange.api_key` has a default.

use serde::Deserialize;

use crate::error::RitError;
use crate::types::ExecutionTarget;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(default)]
    pub module: Option<ModuleMeta>,

    /// REST connection to the RIT client API.
    pub exchange: ExchangeConfig,

    /// Execution algorithm parameters.
    #[serde(default)]
    pub algo: AlgoConfig,

    /// Simulated market used by `--paper` runs.
    #[serde(default)]
    pub sim: SimConfig,
}

impl AppConfig {
    /// Returns the module name, defaulting to `rit_algo`.
    pub fn module_name(&self) -> String {
        self.module.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "rit_algo".into())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.module.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), RitError> {
        if self.exchange.base_url.trim().is_empty() {
            return Err(RitError::Config("exchange.base_url is empty".into()));
        }
        self.algo.validate()?;
        self.sim.validate()
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Exchange connection
// ---------------------------------------------------------------------------

/// REST endpoint and credentials for the RIT client API.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// API base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static API key sent in the `X-API-Key` header.
    pub api_key: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

// ---------------------------------------------------------------------------
// Algorithm parameters
// ---------------------------------------------------------------------------

/// Parameters of the participation-rate execution loop.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgoConfig {
    /// Instrument to trade.
    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Signed target position (positive accumulates, negative liquidates).
    #[serde(default = "default_target_shares")]
    pub target_shares: i64,

    /// Number of traders in the case, used to derive the expected volume.
    #[serde(default = "default_number_traders")]
    pub number_traders: u32,

    /// Expected total market volume. Derived from `number_traders` when absent.
    #[serde(default)]
    pub expected_volume: Option<f64>,

    /// Re-polls for an ACTIVE session after the initial check before giving up.
    #[serde(default = "default_start_poll_attempts")]
    pub start_poll_attempts: u32,

    /// Delay between start polls in milliseconds.
    #[serde(default = "default_start_poll_interval_ms")]
    pub start_poll_interval_ms: u64,

    /// How long orders rest before the cancel-all, in milliseconds.
    #[serde(default = "default_fill_wait_ms")]
    pub fill_wait_ms: u64,

    /// Largest quantity the exchange accepts in one order. Larger legs are split.
    #[serde(default)]
    pub max_order_size: Option<u64>,

    /// Consecutive failed cycles tolerated before the run is aborted.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// First backoff delay after a failed cycle, in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for AlgoConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            target_shares: default_target_shares(),
            number_traders: default_number_traders(),
            expected_volume: None,
            start_poll_attempts: default_start_poll_attempts(),
            start_poll_interval_ms: default_start_poll_interval_ms(),
            fill_wait_ms: default_fill_wait_ms(),
            max_order_size: None,
            max_consecutive_failures: default_max_consecutive_failures(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl AlgoConfig {
    /// Explicit `expected_volume`, or `1_000_000 + (traders / 2) * 100_000`.
    pub fn effective_expected_volume(&self) -> f64 {
        self.expected_volume
            .unwrap_or_else(|| 1_000_000.0 + f64::from(self.number_traders) / 2.0 * 100_000.0)
    }

    /// The immutable target handed to the driver.
    pub fn target(&self) -> ExecutionTarget {
        ExecutionTarget {
            target_position: self.target_shares,
            expected_volume: self.effective_expected_volume(),
        }
    }

    pub fn validate(&self) -> Result<(), RitError> {
        if self.ticker.trim().is_empty() {
            return Err(RitError::Config("algo.ticker is empty".into()));
        }
        let expected = self.effective_expected_volume();
        if !expected.is_finite() || expected <= 0.0 {
            return Err(RitError::Config(format!("expected volume must be positive, got {expected}")));
        }
        if self.max_order_size == Some(0) {
            return Err(RitError::Config("algo.max_order_size must be positive".into()));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(RitError::Config("algo.backoff_initial_ms exceeds backoff_max_ms".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulated market
// ---------------------------------------------------------------------------

/// Shape of the in-memory market used for paper runs.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Session length in ticks.
    #[serde(default = "default_sim_ticks_per_period")]
    pub ticks_per_period: u32,

    /// Wall-clock length of one tick in milliseconds.
    #[serde(default = "default_sim_tick_ms")]
    pub tick_ms: u64,

    /// Initial best bid.
    #[serde(default = "default_sim_bid")]
    pub bid: f64,

    /// Initial best ask.
    #[serde(default = "default_sim_ask")]
    pub ask: f64,

    /// Price increment between ladder levels.
    #[serde(default = "default_sim_price_step")]
    pub price_step: f64,

    /// Ladder depth on each side.
    #[serde(default = "default_sim_levels")]
    pub levels: usize,

    /// Resting size per ladder level.
    #[serde(default = "default_sim_level_size")]
    pub level_size: f64,

    /// Market volume printed by other traders per tick.
    #[serde(default = "default_sim_volume_per_tick")]
    pub volume_per_tick: f64,

    /// Size of the market order sent into each side per tick.
    #[serde(default = "default_sim_flow_per_tick")]
    pub flow_per_tick: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_period: default_sim_ticks_per_period(),
            tick_ms: default_sim_tick_ms(),
            bid: default_sim_bid(),
            ask: default_sim_ask(),
            price_step: default_sim_price_step(),
            levels: default_sim_levels(),
            level_size: default_sim_level_size(),
            volume_per_tick: default_sim_volume_per_tick(),
            flow_per_tick: default_sim_flow_per_tick(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), RitError> {
        if self.ticks_per_period == 0 {
            return Err(RitError::Config("sim.ticks_per_period must be positive".into()));
        }
        if self.tick_ms == 0 {
            return Err(RitError::Config("sim.tick_ms must be positive".into()));
        }
        if self.bid > self.ask {
            return Err(RitError::Config(format!("sim.bid {} above sim.ask {}", self.bid, self.ask)));
        }
        if self.levels == 0 {
            return Err(RitError::Config("sim.levels must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defaults (used by serde)
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    "http://localhost:9999/v1".into()
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

fn default_ticker() -> String {
    "MC".into()
}

fn default_target_shares() -> i64 {
    100_000
}

fn default_number_traders() -> u32 {
    40
}

fn default_start_poll_attempts() -> u32 {
    20
}

fn default_start_poll_interval_ms() -> u64 {
    1_000
}

fn default_fill_wait_ms() -> u64 {
    500
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_backoff_initial_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    5_000
}

fn default_sim_ticks_per_period() -> u32 {
    300
}

fn default_sim_tick_ms() -> u64 {
    250
}

fn default_sim_bid() -> f64 {
    9.99
}

fn default_sim_ask() -> f64 {
    10.01
}

fn default_sim_price_step() -> f64 {
    0.01
}

fn default_sim_levels() -> usize {
    5
}

fn default_sim_level_size() -> f64 {
    5_000.0
}

fn default_sim_volume_per_tick() -> f64 {
    10_000.0
}

fn default_sim_flow_per_tick() -> f64 {
    1_000.0
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"exchange":{"api_key":"38M64LST"}}"#).unwrap();
        assert_eq!(cfg.exchange.base_url, "http://localhost:9999/v1");
        assert_eq!(cfg.algo.ticker, "MC");
        assert_eq!(cfg.algo.target_shares, 100_000);
        assert_eq!(cfg.algo.start_poll_attempts, 20);
        assert_eq!(cfg.algo.fill_wait_ms, 500);
        assert_eq!(cfg.module_name(), "rit_algo");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn expected_volume_derived_from_traders() {
        let algo = AlgoConfig { number_traders: 40, ..AlgoConfig::default() };
        assert_eq!(algo.effective_expected_volume(), 3_000_000.0);

        let algo = AlgoConfig { expected_volume: Some(1_050_000.0), ..AlgoConfig::default() };
        assert_eq!(algo.target().expected_volume, 1_050_000.0);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let algo = AlgoConfig { ticker: " ".into(), ..AlgoConfig::default() };
        assert!(algo.validate().is_err());

        let algo = AlgoConfig { expected_volume: Some(0.0), ..AlgoConfig::default() };
        assert!(algo.validate().is_err());

        let algo = AlgoConfig { max_order_size: Some(0), ..AlgoConfig::default() };
        assert!(algo.validate().is_err());

        let sim = SimConfig { bid: 10.5, ask: 10.0, ..SimConfig::default() };
        assert!(sim.validate().is_err());
    }

    #[test]
    fn missing_api_key_fails_to_parse() {
        assert!(serde_json::from_str::<AppConfig>(r#"{"exchange":{}}"#).is_err());
    }
}
